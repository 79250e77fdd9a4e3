//! Derived surface names.
//!
//! Every generated name is a pure function of the metamodel name, so two
//! compilations of one metamodel produce identical surfaces.

use heck::ToPascalCase;

/// Surface type name of a metamodel type: `book_shelf` becomes `BookShelf`.
pub fn type_name(name: &str) -> String {
    name.to_pascal_case()
}

/// Plural surface name of a metamodel type: `BookCategory` becomes
/// `BookCategories`. Only the last word is inflected.
pub fn plural_name(name: &str) -> String {
    let name = type_name(name);
    let split = last_word_start(&name);
    let (head, last) = name.split_at(split);
    format!("{head}{}", pluralize_word(last))
}

/// Byte offset where the last PascalCase word of `name` starts.
fn last_word_start(name: &str) -> usize {
    name.char_indices()
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0)
}

fn pluralize_word(word: &str) -> String {
    pluralizer::pluralize(word, 2, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_plurals() {
        assert_eq!(plural_name("Book"), "Books");
        assert_eq!(plural_name("Address"), "Addresses");
        assert_eq!(plural_name("Box"), "Boxes");
        assert_eq!(plural_name("Match"), "Matches");
        assert_eq!(plural_name("Category"), "Categories");
        assert_eq!(plural_name("Day"), "Days");
        assert_eq!(plural_name("Analysis"), "Analyses");
    }

    #[test]
    fn test_irregular_and_uncountable() {
        assert_eq!(plural_name("Person"), "People");
        assert_eq!(plural_name("Child"), "Children");
        assert_eq!(plural_name("Sheep"), "Sheep");
        assert_eq!(plural_name("Series"), "Series");
    }

    #[test]
    fn test_irregular_nouns() {
        assert_eq!(plural_name("Quiz"), "Quizzes");
        assert_eq!(plural_name("Leaf"), "Leaves");
        assert_eq!(plural_name("Criterion"), "Criteria");
        assert_eq!(plural_name("Hero"), "Heroes");
        assert_eq!(plural_name("Mouse"), "Mice");
        assert_eq!(plural_name("PlayerQuiz"), "PlayerQuizzes");
    }

    #[test]
    fn test_only_last_word_is_inflected() {
        assert_eq!(plural_name("BookCategory"), "BookCategories");
        assert_eq!(plural_name("SalesPerson"), "SalesPeople");
        assert_eq!(plural_name("book_shelf"), "BookShelves");
    }

    #[test]
    fn test_type_name_casing() {
        assert_eq!(type_name("book_shelf"), "BookShelf");
        assert_eq!(type_name("Author"), "Author");
    }
}
