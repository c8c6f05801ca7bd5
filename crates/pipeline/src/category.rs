//! Keyword-based product category inference.

use serde::Deserialize;

pub const FALLBACK_CATEGORY: &str = "Others";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Ordered category rules; the first rule with a keyword hit wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CategoryVocabulary {
    pub rules: Vec<CategoryRule>,
}

impl CategoryVocabulary {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Infer a category by case-insensitive substring match on the item text.
    pub fn infer(&self, item: &str) -> &str {
        let text = item.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
            })
            .map(|rule| rule.name.as_str())
            .unwrap_or(FALLBACK_CATEGORY)
    }
}

impl Default for CategoryVocabulary {
    fn default() -> Self {
        let rule = |name: &str, keywords: &[&str]| CategoryRule {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        };
        Self::new(vec![
            rule(
                "Electronics",
                &[
                    "earbuds", "headphone", "laptop", "phone", "camera", "charger", "smart",
                    "tech", "device", "usb", "cable",
                ],
            ),
            rule(
                "Fitness",
                &[
                    "fitness", "gym", "workout", "dumbbell", "yoga", "treadmill", "protein",
                    "supplement", "weight", "training", "sport", "mat", "bottle",
                ],
            ),
            rule(
                "Beauty",
                &[
                    "skincare", "serum", "cream", "beauty", "makeup", "shampoo", "conditioner",
                    "soap", "lotion", "perfume", "fragrance", "oil", "balm",
                ],
            ),
            rule(
                "Fashion",
                &[
                    "shoes", "sneaker", "watch", "jacket", "clothing", "sweater", "hoodie",
                    "shirt", "pants", "dress", "jeans", "coat", "wool", "wear",
                ],
            ),
            rule(
                "Home & Kitchen",
                &[
                    "kitchen", "mixer", "cookware", "vacuum", "air fryer", "decor", "light",
                    "lamp", "desk", "chair", "organizer", "cup", "muga",
                ],
            ),
        ])
    }
}
