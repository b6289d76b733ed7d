use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExplainAttribute {
    String(String),
    StringList(Vec<String>),
    Long(i64),
}

impl fmt::Display for ExplainAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplainAttribute::String(v) => write!(f, "{v}"),
            ExplainAttribute::StringList(v) => write!(f, "[{}]", v.join(", ")),
            ExplainAttribute::Long(v) => write!(f, "{v}"),
        }
    }
}

/// Node of a structured explain tree. Attributes keep insertion order.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExplainNode {
    pub name: String,
    pub attributes: IndexMap<String, ExplainAttribute>,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: vec![],
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: ExplainAttribute) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_attribute(key, ExplainAttribute::String(value.into()))
    }

    pub fn with_string_list(self, key: impl Into<String>, value: Vec<String>) -> Self {
        self.with_attribute(key, ExplainAttribute::StringList(value))
    }

    pub fn with_long(self, key: impl Into<String>, value: i64) -> Self {
        self.with_attribute(key, ExplainAttribute::Long(value))
    }

    pub fn with_child(mut self, child: ExplainNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&ExplainAttribute> {
        self.attributes.get(key)
    }

    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.name, indent = depth * 2)?;
        if !self.attributes.is_empty() {
            let attrs = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>();
            write!(f, "({})", attrs.join(", "))?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.fmt_indent(f, depth + 1)?;
        }

        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

/// `STAR_TREE_PROJECT` -> `StarTreeProject`
pub fn to_upper_camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
