//! SDL rendering of a compiled surface.

use std::fmt::Write;

use crate::metamodel::ScalarType;

use super::types::{GeneratedType, SurfaceField, TypeKind};
use super::QuerySurface;

/// Scalars that are not part of the base scalar set and need a declaration.
const CUSTOM_SCALARS: [ScalarType; 5] = [
    ScalarType::Int64,
    ScalarType::Float64,
    ScalarType::Bytes,
    ScalarType::Timestamp,
    ScalarType::Uuid,
];

pub(super) fn print(surface: &QuerySurface) -> String {
    let mut out = String::new();

    for scalar in CUSTOM_SCALARS {
        let _ = writeln!(out, "scalar {}", scalar.surface_name());
    }

    let mut schema = format!("\nschema {{\n  query: {}\n", surface.query_type().name);
    if let Some(stream) = surface.subscription_type() {
        let _ = writeln!(schema, "  subscription: {}", stream.name);
    }
    schema.push_str("}\n");
    out.push_str(&schema);

    for ty in surface.types() {
        out.push('\n');
        print_type(surface, ty, &mut out);
    }
    out
}

fn print_type(surface: &QuerySurface, ty: &GeneratedType, out: &mut String) {
    print_description(ty.description.as_deref(), "", out);
    match &ty.kind {
        TypeKind::Enum(values) => {
            let _ = writeln!(out, "enum {} {{", ty.name);
            for value in values {
                let _ = writeln!(out, "  {value}");
            }
        }
        TypeKind::Object | TypeKind::Input => {
            let keyword = if ty.is_input() { "input" } else { "type" };
            let _ = writeln!(out, "{keyword} {} {{", ty.name);
            for field in &ty.fields {
                print_field(surface, field, out);
            }
        }
    }
    out.push_str("}\n");
}

fn print_field(surface: &QuerySurface, field: &SurfaceField, out: &mut String) {
    print_description(field.description.as_deref(), "  ", out);
    out.push_str("  ");
    out.push_str(&field.name);
    if !field.arguments.is_empty() {
        let args: Vec<String> = field
            .arguments
            .iter()
            .map(|arg| {
                let mut text = format!("{}: {}", arg.name, surface.render_type(&arg.ty));
                if let Some(default) = &arg.default {
                    let _ = write!(text, " = {default}");
                }
                text
            })
            .collect();
        let _ = write!(out, "({})", args.join(", "));
    }
    let _ = writeln!(out, ": {}", surface.render_type(&field.ty));
}

fn print_description(description: Option<&str>, indent: &str, out: &mut String) {
    if let Some(text) = description {
        let _ = writeln!(out, "{indent}\"\"\"{text}\"\"\"");
    }
}
