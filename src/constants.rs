/// Field names and data source tags shared across the pipeline.
///
/// Collectors do not agree on field names, so every canonical field has a
/// short alias list. The first entry is the canonical name.
pub mod fields {
    pub const NAME: &[&str] = &["name", "company_name", "business_name"];
    pub const WEBSITE: &[&str] = &["website", "url", "homepage"];
    pub const INDUSTRY: &[&str] = &["industry", "services", "category"];
    pub const LINKEDIN: &[&str] = &["linkedin", "linkedin_url"];
    pub const EMAIL: &[&str] = &["email", "contact_email"];
    pub const COMPANY_SIZE: &[&str] = &["company_size", "employees", "team_size"];
    pub const PAIN_POINTS: &[&str] = &["pain_points", "description"];
    pub const DATA_SOURCE: &[&str] = &["data_source", "source"];
    pub const DISCOVERED_AT: &[&str] = &["discovered_at", "last_updated"];

    /// Extra attributes carried through as hints for attribute extraction
    pub const HINTS: &[&str] = &[
        "annual_revenue",
        "tech_stack",
        "automation_needs",
        "decision_maker",
        "location",
        "skills",
        "experience_level",
        "hourly_rate",
        "availability",
        "portfolio_url",
        "github_url",
    ];
}

// Source tags emitted by the collectors
pub const CLUTCH_SOURCE: &str = "Clutch.co";
pub const PRODUCT_HUNT_SOURCE: &str = "Product Hunt";
pub const SHOPIFY_SOURCE: &str = "Shopify";
pub const LINKEDIN_SOURCE: &str = "LinkedIn";

/// Tag used when a record carries no source at all
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Priority given to sources missing from the configured priority table
pub const DEFAULT_SOURCE_PRIORITY: u32 = 100;

/// Default merge priority for the known collectors (lower merges first)
pub fn default_source_priorities() -> Vec<(&'static str, u32)> {
    vec![
        (CLUTCH_SOURCE, 1),
        (PRODUCT_HUNT_SOURCE, 2),
        (SHOPIFY_SOURCE, 3),
        (LINKEDIN_SOURCE, 4),
    ]
}
