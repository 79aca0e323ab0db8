//! Symbol reference substitution
//!
//! Renderer files name their symbols instead of inlining them. Before a
//! renderer is decoded, every `symbol` / `defaultSymbol` key holding a
//! non-empty string is replaced in place with that symbol's serialized form.
//!
//! Substitution positions are recognized by key only. Every other object or
//! array is descended into whatever its key, because renderer schemas nest
//! symbol slots inside per-class entries (`uniqueValueInfos`,
//! `classBreakInfos`, ...). Substituted values are not revisited, so the
//! result does not depend on the order sibling keys are visited in.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AtlasError, Result};

/// Keys whose string values name a symbol.
pub const SYMBOL_REFERENCE_KEYS: [&str; 2] = ["symbol", "defaultSymbol"];

/// Anything that can turn a symbol name into its serialized JSON.
pub trait SymbolSource {
    fn resolve_symbol(&self, name: &str) -> Option<Value>;
}

impl SymbolSource for HashMap<String, Value> {
    fn resolve_symbol(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// One reference that was replaced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Substitution {
    /// JSON pointer of the replaced value.
    pub pointer: String,
    /// Symbol name that was referenced there.
    pub symbol: String,
}

struct Visitor<'a, S: SymbolSource + ?Sized> {
    file: &'a str,
    symbols: &'a S,
    substitutions: Vec<Substitution>,
}

impl<S: SymbolSource + ?Sized> Visitor<'_, S> {
    fn visit(&mut self, node: &mut Value, pointer: &str) -> Result<()> {
        match node {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    let child_pointer = format!("{}/{}", pointer, escape_pointer_token(key));
                    if let Some(name) = reference_name(key, child) {
                        *child = self.resolve(&name, child_pointer)?;
                        continue;
                    }
                    self.visit(child, &child_pointer)?;
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter_mut().enumerate() {
                    self.visit(item, &format!("{}/{}", pointer, index))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve(&mut self, name: &str, pointer: String) -> Result<Value> {
        let resolved = self.symbols.resolve_symbol(name).ok_or_else(|| {
            AtlasError::UnresolvedSymbolReference {
                file: self.file.to_string(),
                symbol: name.to_string(),
                pointer: pointer.clone(),
            }
        })?;
        self.substitutions.push(Substitution {
            pointer,
            symbol: name.to_string(),
        });
        Ok(resolved)
    }
}

fn reference_name(key: &str, value: &Value) -> Option<String> {
    if !SYMBOL_REFERENCE_KEYS.contains(&key) {
        return None;
    }
    match value {
        Value::String(name) if !name.is_empty() => Some(name.clone()),
        _ => None,
    }
}

/// RFC 6901 escaping of a single pointer token.
fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Replace every symbol reference in `tree` with its resolved symbol.
///
/// `file` names the renderer being resolved and is only used for errors.
/// The returned substitutions are sorted by pointer.
///
/// # Errors
/// - `UnresolvedSymbolReference` for the first reference `symbols` cannot
///   resolve. `tree` may then be partially substituted and should be
///   discarded.
pub fn substitute_symbols<S: SymbolSource + ?Sized>(
    tree: &mut Value,
    file: &str,
    symbols: &S,
) -> Result<Vec<Substitution>> {
    let mut visitor = Visitor {
        file,
        symbols,
        substitutions: Vec::new(),
    };
    visitor.visit(tree, "")?;
    let mut substitutions = visitor.substitutions;
    substitutions.sort();
    Ok(substitutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use serde_json::json;

    fn palette() -> HashMap<String, Value> {
        HashMap::from([
            (
                "redDot".to_string(),
                json!({"type": "simple-marker", "color": "red"}),
            ),
            (
                "grayDot".to_string(),
                json!({"type": "simple-marker", "color": "gray"}),
            ),
        ])
    }

    #[test]
    fn test_top_level_symbol() {
        let mut tree = json!({"type": "simple", "symbol": "redDot"});

        let subs = substitute_symbols(&mut tree, "simple.json", &palette()).unwrap();

        assert_eq!(
            tree,
            json!({"type": "simple", "symbol": {"type": "simple-marker", "color": "red"}})
        );
        assert_eq!(
            subs,
            vec![Substitution {
                pointer: "/symbol".to_string(),
                symbol: "redDot".to_string()
            }]
        );
    }

    #[test]
    fn test_nested_in_arrays_and_objects() {
        let mut tree = json!({
            "type": "unique-value",
            "defaultSymbol": "grayDot",
            "uniqueValueInfos": [
                {"value": "a", "symbol": "redDot"},
                {"value": "b", "symbol": "grayDot"}
            ],
            "legendOptions": {"nested": {"symbol": "redDot"}}
        });

        let subs = substitute_symbols(&mut tree, "uv.json", &palette()).unwrap();

        assert_eq!(tree["uniqueValueInfos"][0]["symbol"]["color"], json!("red"));
        assert_eq!(tree["uniqueValueInfos"][1]["symbol"]["color"], json!("gray"));
        assert_eq!(tree["legendOptions"]["nested"]["symbol"]["color"], json!("red"));
        let pointers: Vec<&str> = subs.iter().map(|s| s.pointer.as_str()).collect();
        assert_eq!(
            pointers,
            vec![
                "/defaultSymbol",
                "/legendOptions/nested/symbol",
                "/uniqueValueInfos/0/symbol",
                "/uniqueValueInfos/1/symbol",
            ]
        );
    }

    #[test]
    fn test_non_reference_values_left_alone() {
        let mut tree = json!({
            "type": "simple",
            "symbol": "",
            "defaultSymbol": null,
            "label": "redDot",
            "other": {"symbol": {"type": "simple-line"}}
        });
        let before = tree.clone();

        let subs = substitute_symbols(&mut tree, "plain.json", &palette()).unwrap();

        assert!(subs.is_empty());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_unresolved_reference_reports_pointer() {
        let mut tree = json!({
            "type": "class-breaks",
            "classBreakInfos": [{"maxValue": 1, "symbol": "redDot"}, {"maxValue": 2, "symbol": "a/b"}]
        });

        let err = substitute_symbols(&mut tree, "breaks.json", &palette()).unwrap_err();

        match err {
            AtlasError::UnresolvedSymbolReference {
                file,
                symbol,
                pointer,
            } => {
                assert_eq!(file, "breaks.json");
                assert_eq!(symbol, "a/b");
                assert_eq!(pointer, "/classBreakInfos/1/symbol");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_pointer_tokens_are_escaped() {
        assert_eq!(escape_pointer_token("a/b~c"), "a~1b~0c");
    }

    struct RecordingSource {
        inner: HashMap<String, Value>,
        lookups: RefCell<Vec<String>>,
    }

    impl SymbolSource for RecordingSource {
        fn resolve_symbol(&self, name: &str) -> Option<Value> {
            self.lookups.borrow_mut().push(name.to_string());
            self.inner.resolve_symbol(name)
        }
    }

    #[test]
    fn test_each_reference_is_looked_up_once() {
        let source = RecordingSource {
            inner: palette(),
            lookups: RefCell::new(Vec::new()),
        };
        let mut tree = json!({
            "type": "class-breaks",
            "defaultSymbol": "grayDot",
            "classBreakInfos": [
                {"maxValue": 1, "symbol": "redDot"},
                {"maxValue": 2, "symbol": "grayDot"}
            ]
        });

        let subs = substitute_symbols(&mut tree, "breaks.json", &source).unwrap();

        assert_eq!(subs.len(), 3);
        assert_eq!(
            source.lookups.into_inner(),
            vec!["redDot", "grayDot", "grayDot"]
        );
        assert_eq!(
            tree["defaultSymbol"],
            json!({"type": "simple-marker", "color": "gray"})
        );
    }

    #[test]
    fn test_substituted_symbol_is_not_revisited() {
        let symbols = HashMap::from([(
            "loop".to_string(),
            json!({"type": "text", "symbol": "loop"}),
        )]);
        let mut tree = json!({"symbol": "loop"});

        let subs = substitute_symbols(&mut tree, "loop.json", &symbols).unwrap();

        assert_eq!(subs.len(), 1);
        assert_eq!(tree, json!({"symbol": {"type": "text", "symbol": "loop"}}));
    }
}
