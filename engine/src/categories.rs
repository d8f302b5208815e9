//! Fixed mapping from the categories an administrator picks to schema namespaces.

const CATEGORIES: &[(&str, &str)] = &[
    ("Users", "chrome.users"),
    ("User Application settings", "chrome.users.appsconfig"),
    ("Devices", "chrome.devices"),
    ("Managed Guest", "chrome.devices.managedguest"),
    ("Kiosk", "chrome.devices.kiosk"),
    ("Networks Global Settings", "chrome.networks.globalsettings"),
];

pub fn namespace_for(category: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, ns)| *ns)
}

/// Canonical spelling of a category name, for matching user input case-insensitively.
pub fn canonical_name(category: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(name, _)| *name)
}

pub fn category_for_namespace(namespace: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(_, ns)| *ns == namespace)
        .map(|(name, _)| *name)
}

/// All categories in display order.
pub fn all() -> impl Iterator<Item = (&'static str, &'static str)> {
    CATEGORIES.iter().copied()
}
