//! Deterministic cache keys.
//!
//! `route:club?name=value&...` with parameters in lexical order, values
//! trimmed, list values sorted and de-duplicated. Reserved characters in
//! values are percent-escaped so distinct inputs cannot render the same key.

use std::collections::BTreeMap;
use std::fmt;

use crate::policy::RouteId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    rendered: String,
    club_id: String,
}

impl CacheKey {
    pub fn builder(route: RouteId, club_id: &str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            route,
            club_id: club_id.trim().to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn club_id(&self) -> &str {
        &self.club_id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

pub struct CacheKeyBuilder {
    route: RouteId,
    club_id: String,
    params: BTreeMap<&'static str, String>,
}

impl CacheKeyBuilder {
    pub fn param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.params.insert(name, escape(value.to_string().trim()));
        self
    }

    pub fn opt_param<T: fmt::Display>(self, name: &'static str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn flag(self, name: &'static str, value: bool) -> Self {
        self.param(name, if value { "1" } else { "0" })
    }

    /// Order-insensitive list parameter. `None` and an empty list differ.
    pub fn list(mut self, name: &'static str, values: Option<&[String]>) -> Self {
        let Some(values) = values else {
            return self;
        };
        let mut items: Vec<String> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(escape)
            .collect();
        items.sort();
        items.dedup();
        self.params.insert(name, format!("[{}]", items.join(",")));
        self
    }

    pub fn build(self) -> CacheKey {
        let mut rendered = format!("{}:{}", self.route.as_str(), escape(&self.club_id));
        let mut sep = '?';
        for (name, value) in &self.params {
            rendered.push(sep);
            rendered.push_str(name);
            rendered.push('=');
            rendered.push_str(value);
            sep = '&';
        }
        CacheKey {
            rendered,
            club_id: self.club_id,
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' | '&' | '=' | ':' | '?' | ',' | '[' | ']' => {
                out.push_str(&format!("%{:02X}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out
}
