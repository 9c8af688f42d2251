//! Grouping classified highlights by category.

use serde::Serialize;
use tracing::debug;

use annorelay_shared::{Category, ClassifiedAnnotation};

/// Texts of one category in extraction order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTexts {
    pub category: Category,
    pub texts: Vec<String>,
}

/// Non-empty categories in [`Category::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Aggregate {
    groups: Vec<CategoryTexts>,
}

impl Aggregate {
    /// Texts for `category`, `None` when the category had no highlights.
    pub fn get(&self, category: Category) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.category == category)
            .map(|g| g.texts.as_slice())
    }

    pub fn groups(&self) -> &[CategoryTexts] {
        &self.groups
    }
}

/// Group annotation texts by category.
///
/// Within a category the input order is kept. Categories come out in the
/// fixed enumeration order regardless of which appeared first, and empty
/// categories are left out.
pub fn aggregate(annotations: &[ClassifiedAnnotation]) -> Aggregate {
    let groups: Vec<CategoryTexts> = Category::ALL
        .iter()
        .filter_map(|&category| {
            let texts: Vec<String> = annotations
                .iter()
                .filter(|a| a.category == category)
                .map(|a| a.text.clone())
                .collect();
            (!texts.is_empty()).then_some(CategoryTexts { category, texts })
        })
        .collect();

    debug!(
        categories = groups.len(),
        annotations = annotations.len(),
        "aggregated highlights"
    );
    Aggregate { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annorelay_shared::ColorBucket;

    fn ann(id: i64, text: &str, bucket: ColorBucket) -> ClassifiedAnnotation {
        ClassifiedAnnotation {
            id,
            text: text.into(),
            bucket,
            category: bucket.category(),
        }
    }

    #[test]
    fn groups_in_enumeration_order() {
        let anns = vec![
            ann(1, "limit", ColorBucket::Red),
            ann(2, "method a", ColorBucket::Yellow),
            ann(3, "result", ColorBucket::Blue),
            ann(4, "method b", ColorBucket::Yellow),
        ];
        let agg = aggregate(&anns);

        let order: Vec<Category> = agg.groups().iter().map(|g| g.category).collect();
        assert_eq!(
            order,
            vec![Category::Methods, Category::Results, Category::Limitations]
        );
        assert_eq!(
            agg.get(Category::Methods),
            Some(&["method a".to_string(), "method b".to_string()][..])
        );
        assert_eq!(agg.get(Category::Claims), None);
    }

    #[test]
    fn empty_input_yields_empty_aggregate() {
        let agg = aggregate(&[]);
        assert!(agg.groups().is_empty());
    }
}
