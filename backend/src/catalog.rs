use shared::Category;

/// Number of classes every category model predicts.
pub const CLASS_COUNT: usize = 3;

/// Ordered condition labels. Index 0 is always the healthy/normal label and
/// index `i` matches position `i` of a model's output vector.
pub type LabelSet = [&'static str; CLASS_COUNT];

const TONGUE_CLASSES: LabelSet = ["Normal Tongue", "Coated Tongue", "Geographic Tongue"];
const NAIL_CLASSES: LabelSet = [
    "Healthy Nail",
    "Fungal Infection",
    "Nail Discoloration / Iron Deficiency",
];
const ANKLE_CLASSES: LabelSet = ["Healthy Ankle", "Ankle Swelling", "Skin Inflammation"];
const FOOT_CLASSES: LabelSet = ["Healthy Foot", "Fungal Foot Infection", "Foot Callus / Corn"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("class index {index} out of range for {category}")]
    IndexOutOfRange { category: Category, index: usize },
}

pub fn labels_for(category: Category) -> &'static LabelSet {
    match category {
        Category::Tongue => &TONGUE_CLASSES,
        Category::Nail => &NAIL_CLASSES,
        Category::Ankle => &ANKLE_CLASSES,
        Category::Foot => &FOOT_CLASSES,
    }
}

pub fn label_at(category: Category, index: usize) -> Result<&'static str, LabelError> {
    labels_for(category)
        .get(index)
        .copied()
        .ok_or(LabelError::IndexOutOfRange { category, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn nail_index_one_is_fungal_infection() {
        assert_eq!(label_at(Category::Nail, 1), Ok("Fungal Infection"));
    }

    #[test]
    fn tongue_index_two_is_geographic() {
        assert_eq!(label_at(Category::Tongue, 2), Ok("Geographic Tongue"));
    }

    #[test]
    fn first_label_is_the_healthy_one() {
        for category in Category::iter() {
            let first = labels_for(category)[0];
            assert!(
                first.starts_with("Normal") || first.starts_with("Healthy"),
                "{category}: {first}"
            );
        }
    }

    #[test]
    fn label_sets_do_not_overlap() {
        let all: Vec<&str> = Category::iter()
            .flat_map(|c| labels_for(c).iter().copied())
            .collect();
        for (i, label) in all.iter().enumerate() {
            assert!(!all[i + 1..].contains(label), "duplicate label {label}");
        }
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        assert_eq!(
            label_at(Category::Foot, 3),
            Err(LabelError::IndexOutOfRange {
                category: Category::Foot,
                index: 3
            })
        );
    }
}
