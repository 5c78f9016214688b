//! Site-wide storefront content: header, footer and general site info.
//!
//! Each key has its own schema and is validated on write, so a malformed
//! menu is refused by the back office instead of breaking the storefront.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct Link {
    pub label: String,
    /// Site-relative path ("/about") or absolute http(s) URL
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct MenuItem {
    pub id: u32,
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinterest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

impl SocialLinks {
    fn entries(&self) -> impl Iterator<Item = (&'static str, &String)> {
        [
            ("facebook", &self.facebook),
            ("instagram", &self.instagram),
            ("twitter", &self.twitter),
            ("pinterest", &self.pinterest),
            ("youtube", &self.youtube),
        ]
        .into_iter()
        .filter_map(|(name, url)| url.as_ref().map(|u| (name, u)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct CtaButton {
    #[serde(default)]
    pub visible: bool,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct HeaderConfig {
    pub logo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_button: Option<CtaButton>,
    #[serde(default)]
    pub social_links: SocialLinks,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        HeaderConfig {
            logo: "/storage/logo.png".to_string(),
            site_name: None,
            menu_items: Vec::new(),
            contact: None,
            cta_button: None,
            social_links: SocialLinks::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct FooterColumn {
    pub title: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct Newsletter {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct FooterConfig {
    #[serde(default)]
    pub columns: Vec<FooterColumn>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde(default)]
    pub copyright: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newsletter: Option<Newsletter>,
    #[serde(default)]
    pub payment_methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct SiteInfo {
    pub site_name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        SiteInfo {
            site_name: "Bhavana Silver Jewellers".to_string(),
            tagline: String::new(),
            description: String::new(),
        }
    }
}

/// Everything persisted in `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SiteSettings {
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub footer: FooterConfig,
    #[serde(default)]
    pub site_info: SiteInfo,
}

impl SiteSettings {
    pub fn validate(&self) -> Result<()> {
        for section in SettingsSection::ALL {
            section.validate(self)?;
        }
        Ok(())
    }
}

/// One independently editable part of [`SiteSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSection {
    Header,
    Footer,
    SiteInfo,
}

impl SettingsSection {
    pub const ALL: [SettingsSection; 3] = [
        SettingsSection::Header,
        SettingsSection::Footer,
        SettingsSection::SiteInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingsSection::Header => "header",
            SettingsSection::Footer => "footer",
            SettingsSection::SiteInfo => "site_info",
        }
    }

    /// Validate this section only; the others are left as stored.
    pub fn validate(self, settings: &SiteSettings) -> Result<()> {
        match self {
            SettingsSection::Header => settings.header.validate(),
            SettingsSection::Footer => settings.footer.validate(),
            SettingsSection::SiteInfo => settings.site_info.validate(),
        }
    }
}

impl HeaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.logo.trim().is_empty() {
            return Err(CatalogError::invalid("header.logo", "must not be empty"));
        }
        let mut ids = HashSet::new();
        for (i, item) in self.menu_items.iter().enumerate() {
            let field = format!("header.menu_items[{}]", i);
            if !ids.insert(item.id) {
                return Err(CatalogError::invalid(field, format!("duplicate menu id {}", item.id)));
            }
            validate_link(&field, &item.label, &item.url)?;
            for (j, sub) in item.subcategories.iter().enumerate() {
                validate_link(&format!("{}.subcategories[{}]", field, j), &sub.label, &sub.url)?;
            }
        }
        if let Some(cta) = &self.cta_button {
            if cta.visible {
                validate_link("header.cta_button", &cta.text, &cta.url)?;
            }
        }
        if let Some(contact) = &self.contact {
            validate_contact("header.contact", contact)?;
        }
        validate_social("header.social_links", &self.social_links)
    }
}

impl FooterConfig {
    pub fn validate(&self) -> Result<()> {
        for (i, column) in self.columns.iter().enumerate() {
            let field = format!("footer.columns[{}]", i);
            if column.title.trim().is_empty() {
                return Err(CatalogError::invalid(format!("{}.title", field), "must not be empty"));
            }
            for (j, link) in column.links.iter().enumerate() {
                validate_link(&format!("{}.links[{}]", field, j), &link.label, &link.url)?;
            }
        }
        if self.payment_methods.iter().any(|m| m.trim().is_empty()) {
            return Err(CatalogError::invalid(
                "footer.payment_methods",
                "entries must not be empty",
            ));
        }
        validate_contact("footer.contact_info", &self.contact_info)?;
        validate_social("footer.social_links", &self.social_links)
    }
}

impl SiteInfo {
    pub fn validate(&self) -> Result<()> {
        if self.site_name.trim().is_empty() {
            return Err(CatalogError::invalid("site_info.site_name", "must not be empty"));
        }
        Ok(())
    }
}

fn validate_link(field: &str, label: &str, url: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(CatalogError::invalid(format!("{}.label", field), "must not be empty"));
    }
    if !is_site_url(url) {
        return Err(CatalogError::invalid(
            format!("{}.url", field),
            format!("'{}' is neither a site path nor an http(s) URL", url),
        ));
    }
    Ok(())
}

fn validate_contact(field: &str, contact: &ContactInfo) -> Result<()> {
    if let Some(email) = &contact.email {
        let valid = email
            .split_once('@')
            .is_some_and(|(user, host)| !user.is_empty() && host.contains('.'));
        if !valid {
            return Err(CatalogError::invalid(
                format!("{}.email", field),
                format!("'{}' is not an email address", email),
            ));
        }
    }
    Ok(())
}

fn validate_social(field: &str, links: &SocialLinks) -> Result<()> {
    for (name, url) in links.entries() {
        if !is_absolute_url(url) {
            return Err(CatalogError::invalid(
                format!("{}.{}", field, name),
                format!("'{}' must be an http(s) URL", url),
            ));
        }
    }
    Ok(())
}

fn is_absolute_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn is_site_url(url: &str) -> bool {
    url.starts_with('/') || url.starts_with('#') || is_absolute_url(url)
}
