//! Fixed category taxonomy. IDs are stable; labels are display strings.

pub const ORG_CATEGORY_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: i32,
    pub label: &'static str,
}

/// The eight organizational-survey scoring dimensions.
pub static ORG_CATEGORIES: [Category; ORG_CATEGORY_COUNT] = [
    Category { id: 1, label: "変革意識" },
    Category { id: 2, label: "成果志向" },
    Category { id: 3, label: "顧客志向" },
    Category { id: 4, label: "組織連携" },
    Category { id: 5, label: "人材育成" },
    Category { id: 6, label: "心理的安全性" },
    Category { id: 7, label: "業務改善" },
    Category { id: 8, label: "理念浸透" },
];

/// Grouping labels used by the problem bank. Each problem carries one of
/// these plus the scoring category id it feeds.
pub static PROBLEM_CATEGORIES: [&str; 4] = ["組織風土", "業務遂行", "対人関係", "成長支援"];

/// Growth-survey categories (questions are authored against these four).
pub static GROWTH_CATEGORIES: [&str; 4] = ["ルール", "組織体制", "評価制度", "週報・会議"];

/// Derived bonus display category sourced from the organizational survey.
/// Never authored against; appended to growth-survey chart output.
pub const GROWTH_BONUS_CATEGORY: &str = "組織サーベイ";

pub fn org_category_label(id: i32) -> Option<&'static str> {
    ORG_CATEGORIES
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.label)
}

pub fn is_problem_category(label: &str) -> bool {
    PROBLEM_CATEGORIES.contains(&label)
}

pub fn is_growth_category(label: &str) -> bool {
    GROWTH_CATEGORIES.contains(&label)
}

/// The five growth-survey display categories: four real plus the bonus.
pub fn growth_display_categories() -> [&'static str; 5] {
    [
        GROWTH_CATEGORIES[0],
        GROWTH_CATEGORIES[1],
        GROWTH_CATEGORIES[2],
        GROWTH_CATEGORIES[3],
        GROWTH_BONUS_CATEGORY,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_ids_are_dense_and_stable() {
        for (idx, category) in ORG_CATEGORIES.iter().enumerate() {
            assert_eq!(category.id, idx as i32 + 1);
        }
        assert_eq!(org_category_label(1), Some("変革意識"));
        assert_eq!(org_category_label(9), None);
    }

    #[test]
    fn growth_display_set_has_bonus_last() {
        let display = growth_display_categories();
        assert_eq!(display.len(), 5);
        assert_eq!(display[4], GROWTH_BONUS_CATEGORY);
        assert!(!is_growth_category(GROWTH_BONUS_CATEGORY));
    }
}
