//! Lightweight `schema.prisma` reader.
//!
//! Mutations that assume schema shape (a `role` vs `title` field, a
//! status enum) verify against this parse before touching source, and skip
//! with a warning when the assumption does not hold.

use crate::error::{RepofixError, Result};
use crate::paths::PRISMA_SCHEMA;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelField {
    pub name: String,
    pub ty: String,
}

/// Parsed view of the pieces repofix cares about.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub enums: BTreeMap<String, Vec<String>>,
    pub models: BTreeMap<String, Vec<ModelField>>,
}

impl Schema {
    /// Load `prisma/schema.prisma` under `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(PRISMA_SCHEMA);
        if !path.exists() {
            return Err(RepofixError::SchemaNotFound(path));
        }
        let src = std::fs::read_to_string(&path)?;
        Ok(Self::parse(&src))
    }

    pub fn parse(src: &str) -> Self {
        Self {
            enums: parse_blocks(src, "enum")
                .into_iter()
                .map(|(name, body)| (name, enum_values(&body)))
                .collect(),
            models: parse_blocks(src, "model")
                .into_iter()
                .map(|(name, body)| (name, model_fields(&body)))
                .collect(),
        }
    }

    pub fn model(&self, name: &str) -> Option<&[ModelField]> {
        self.models.get(name).map(|v| v.as_slice())
    }

    pub fn model_has_field(&self, model: &str, field: &str) -> bool {
        self.model(model)
            .is_some_and(|fields| fields.iter().any(|f| f.name == field))
    }

    pub fn field_type(&self, model: &str, field: &str) -> Option<&str> {
        self.model(model)?
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.ty.as_str())
    }

    /// The enum backing `model.field`, when the field's type names one.
    pub fn enum_for_field(&self, model: &str, field: &str) -> Option<&str> {
        let ty = self.field_type(model, field)?.trim_end_matches('?');
        self.enums.get_key_value(ty).map(|(k, _)| k.as_str())
    }
}

fn block_start_re(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?m)^\s*{keyword}\s+([A-Za-z0-9_]+)\s*\{{")).unwrap()
}

fn model_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| block_start_re("model"))
}

fn enum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| block_start_re("enum"))
}

/// Extract `keyword Name { … }` blocks with brace-balanced scanning, so
/// nested braces in attribute arguments don't truncate the body.
fn parse_blocks(src: &str, keyword: &str) -> Vec<(String, String)> {
    let re = match keyword {
        "model" => model_re(),
        "enum" => enum_re(),
        _ => unreachable!("unsupported block keyword"),
    };
    let mut out = Vec::new();
    for caps in re.captures_iter(src) {
        let name = caps[1].to_string();
        let open = caps.get(0).unwrap().end();
        let mut depth = 1usize;
        let mut end = open;
        for (i, ch) in src[open..].char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = open + i;
                        break;
                    }
                }
                _ => {}
            }
        }
        out.push((name, src[open..end].to_string()));
    }
    out
}

fn enum_values(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//") && !l.starts_with("@@"))
        .map(|l| l.trim_end_matches([',', ' ']).to_string())
        .collect()
}

fn model_fields(body: &str) -> Vec<ModelField> {
    let mut out = Vec::new();
    for line in body.lines() {
        let l = line.trim();
        if l.is_empty() || l.starts_with("//") || l.starts_with("@@") {
            continue;
        }
        let mut parts = l.split_whitespace();
        let (Some(name), Some(ty)) = (parts.next(), parts.next()) else {
            continue;
        };
        out.push(ModelField {
            name: name.to_string(),
            ty: ty.to_string(),
        });
    }
    out
}
