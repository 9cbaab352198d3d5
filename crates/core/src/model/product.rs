use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown product slug: {0}")]
pub struct UnknownProduct(pub String);

/// Exam product a learner prepares for.
///
/// The product decides which test type is requested from the question
/// catalogue; it is passed explicitly to the session controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    #[default]
    EduTest,
    Acer,
    NaplanYear5,
    NaplanYear7,
    VicSelective,
    NswSelective,
}

impl Product {
    pub const ALL: [Product; 6] = [
        Product::EduTest,
        Product::Acer,
        Product::NaplanYear5,
        Product::NaplanYear7,
        Product::VicSelective,
        Product::NswSelective,
    ];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Product::EduTest => "edutest",
            Product::Acer => "acer",
            Product::NaplanYear5 => "naplan-year5",
            Product::NaplanYear7 => "naplan-year7",
            Product::VicSelective => "vic-selective",
            Product::NswSelective => "nsw-selective",
        }
    }

    /// Human-facing product name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Product::EduTest => "EduTest Scholarship",
            Product::Acer => "ACER Scholarship",
            Product::NaplanYear5 => "Year 5 NAPLAN",
            Product::NaplanYear7 => "Year 7 NAPLAN",
            Product::VicSelective => "VIC Selective Entry",
            Product::NswSelective => "NSW Selective Entry",
        }
    }

    /// Catalogue test-type key for this product.
    ///
    /// The catalogue stores EduTest questions under `EduTest`; every other
    /// product is keyed by its slug.
    #[must_use]
    pub fn test_type(self) -> &'static str {
        normalize_test_type(self.slug())
    }
}

/// Maps a product slug to the catalogue's test-type key.
#[must_use]
pub fn normalize_test_type(slug: &str) -> &str {
    if slug.to_ascii_lowercase().contains("edutest") {
        "EduTest"
    } else {
        slug
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Product {
    type Err = UnknownProduct;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Product::ALL
            .into_iter()
            .find(|p| p.slug() == wanted)
            .ok_or_else(|| UnknownProduct(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edutest_slug_normalizes_to_catalogue_key() {
        assert_eq!(Product::EduTest.test_type(), "EduTest");
        assert_eq!(normalize_test_type("EDUTEST-2025"), "EduTest");
        assert_eq!(Product::Acer.test_type(), "acer");
        assert_eq!(Product::NswSelective.test_type(), "nsw-selective");
    }

    #[test]
    fn parses_every_slug() {
        for product in Product::ALL {
            assert_eq!(product.slug().parse::<Product>().unwrap(), product);
        }
        assert_eq!(" ACER ".parse::<Product>().unwrap(), Product::Acer);
        assert!("sat".parse::<Product>().is_err());
    }

    #[test]
    fn default_is_edutest() {
        assert_eq!(Product::default(), Product::EduTest);
        assert_eq!(Product::default().to_string(), "EduTest Scholarship");
    }
}
