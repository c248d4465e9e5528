/// The fixed set of book categories, each with its own subcategories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    EducationalAndSocialSciences,
    Humanities,
    EconomicAndAdministrativeSciences,
    LawBooks,
    LanguageAndLiteratureBooks,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::EducationalAndSocialSciences,
        Category::Humanities,
        Category::EconomicAndAdministrativeSciences,
        Category::LawBooks,
        Category::LanguageAndLiteratureBooks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::EducationalAndSocialSciences => {
                "educational and social sciences"
            }
            Category::Humanities => "humanities",
            Category::EconomicAndAdministrativeSciences => {
                "economic and administrative sciences"
            }
            Category::LawBooks => "law books",
            Category::LanguageAndLiteratureBooks => {
                "language and literature books"
            }
        }
    }

    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            Category::EducationalAndSocialSciences => {
                &["psychology", "sociology", "education"]
            }
            Category::Humanities => &[
                "history",
                "geography",
                "philosophy and thought",
                "culture",
                "archaeology",
                "heritage",
                "media",
                "sociology",
            ],
            Category::EconomicAndAdministrativeSciences => {
                &["management", "economics", "politics"]
            }
            Category::LawBooks => &["law", "sharia and preaching"],
            Category::LanguageAndLiteratureBooks => {
                &["literature", "language", "dictionaries", "poetry and stories"]
            }
        }
    }

    pub fn admits(&self, subcategory: &str) -> bool {
        self.subcategories().contains(&subcategory)
    }

    /// Fails when `subcategory` does not belong to this category.
    pub fn check_subcategory(&self, subcategory: &str) -> Result<(), String> {
        if self.admits(subcategory) {
            Ok(())
        } else {
            Err(format!(
                "Subcategory \"{}\" is not valid for category \"{}\".",
                subcategory,
                self.as_str()
            ))
        }
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == value.trim())
            .ok_or_else(|| format!("{} is not a valid category.", value))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
