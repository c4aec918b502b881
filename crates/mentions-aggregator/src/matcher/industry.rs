//! Per-industry context vocabulary for the disambiguation stage.

/// Keys are lowercase industry tags. Terms are compared against whole lowercase words.
pub(crate) const INDUSTRY_CONTEXT: &[(&str, &[&str])] = &[
    (
        "tech",
        &[
            "software", "app", "startup", "cloud", "platform", "device", "launch", "update",
            "api", "developer", "ai", "release",
        ],
    ),
    (
        "finance",
        &[
            "bank", "stock", "shares", "earnings", "investor", "loan", "credit", "fund",
            "trading", "revenue",
        ],
    ),
    (
        "food",
        &[
            "restaurant", "menu", "recipe", "flavor", "snack", "meal", "delivery", "kitchen",
            "taste",
        ],
    ),
    (
        "beverage",
        &[
            "drink", "beverage", "soda", "seltzer", "brew", "bottle", "can", "flavor", "sip",
        ],
    ),
    (
        "automotive",
        &[
            "car", "vehicle", "ev", "engine", "dealer", "recall", "model", "suv", "truck",
            "charging",
        ],
    ),
    (
        "fashion",
        &[
            "clothing", "apparel", "collection", "runway", "sneaker", "wear", "style",
            "designer", "outfit",
        ],
    ),
    (
        "retail",
        &[
            "store", "shop", "shopping", "discount", "sale", "checkout", "order", "customer",
            "price",
        ],
    ),
    (
        "healthcare",
        &[
            "patient", "clinic", "hospital", "treatment", "drug", "trial", "doctor", "health",
            "fda",
        ],
    ),
    (
        "gaming",
        &[
            "game", "gaming", "console", "player", "esports", "steam", "patch", "multiplayer",
        ],
    ),
    (
        "travel",
        &[
            "flight", "hotel", "airline", "booking", "trip", "travel", "airport", "vacation",
        ],
    ),
];

/// Context terms for an industry tag, if the tag is known.
pub(crate) fn context_terms(industry: &str) -> Option<&'static [&'static str]> {
    let wanted = industry.trim().to_lowercase();
    INDUSTRY_CONTEXT
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, terms)| *terms)
}
