//! Pure tree operations over scene documents (`serde_yaml::Value`): the
//! `import` field, deep map-merge, and texture-candidate scalar discovery.

use serde_yaml::{Mapping, Value};

/// One step of a path into a `Value` tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// A mapping key.
    Key(String),
    /// A sequence index.
    Index(usize),
}

/// A path of steps from the document root to some scalar.
pub type Path = Vec<Step>;

/// Removes and returns the root-level `import` field's URLs, if present.
/// Only the root-level key is honored — an `import` key nested inside a
/// sub-map is left untouched, per the importer's documented behavior.
pub fn take_import_field(doc: &mut Value) -> Vec<String> {
    let Value::Mapping(map) = doc else {
        return Vec::new();
    };
    let key = Value::String("import".to_string());
    let Some(removed) = map.remove(&key) else {
        return Vec::new();
    };

    match removed {
        Value::String(s) => vec![s],
        Value::Sequence(seq) => seq
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Deep map-merges `overlay` onto `base`: for two maps at the same key,
/// recurses; otherwise `overlay` wins and overwrites `base`. Mismatched,
/// both-non-null types are logged and still overwritten by `overlay`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (Value::Null, overlay) => overlay,
        (base, Value::Null) => base,
        (base, overlay) => {
            if std::mem::discriminant(&base) != std::mem::discriminant(&overlay) {
                log::warn!("scene document merge overwrites a value with a different type");
            }
            overlay
        }
    }
}

/// Reads the value at `path`, if it exists.
pub fn get_at_path<'a>(doc: &'a Value, path: &[Step]) -> Option<&'a Value> {
    let mut current = doc;
    for step in path {
        current = match (step, current) {
            (Step::Key(key), Value::Mapping(map)) => map.get(&Value::String(key.clone()))?,
            (Step::Index(i), Value::Sequence(seq)) => seq.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutably reads the value at `path`, if it exists.
pub fn get_at_path_mut<'a>(doc: &'a mut Value, path: &[Step]) -> Option<&'a mut Value> {
    let mut current = doc;
    for step in path {
        current = match (step, current) {
            (Step::Key(key), Value::Mapping(map)) => {
                map.get_mut(&Value::String(key.clone()))?
            }
            (Step::Index(i), Value::Sequence(seq)) => seq.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

const MATERIAL_TEXTURE_SLOTS: &[&str] = &["emission", "ambient", "diffuse", "specular", "normal"];

/// Walks the fixed texture-reference locations under every `styles.<name>`
/// entry of `doc`, returning the path to each scalar that is a texture
/// candidate.
pub fn collect_texture_candidates(doc: &Value) -> Vec<Path> {
    let mut found = Vec::new();
    let Some(Value::Mapping(styles)) = get_at_path(doc, &[Step::Key("styles".into())]) else {
        return found;
    };

    for (style_key, style_value) in styles {
        let Some(style_name) = style_key.as_str() else {
            continue;
        };
        let style_prefix = vec![Step::Key("styles".into()), Step::Key(style_name.into())];

        check_candidate_path(style_value, &style_prefix, &[Step::Key("texture".into())], &mut found);

        for slot in MATERIAL_TEXTURE_SLOTS {
            let rel = [
                Step::Key("material".into()),
                Step::Key((*slot).into()),
                Step::Key("texture".into()),
            ];
            check_candidate_path(style_value, &style_prefix, &rel, &mut found);
        }

        check_uniform_candidates(style_value, &style_prefix, &mut found);
    }

    found
}

fn check_candidate_path(style_value: &Value, prefix: &Path, rel: &[Step], found: &mut Vec<Path>) {
    let Some(value) = get_at_path(style_value, rel) else {
        return;
    };
    if is_texture_candidate_scalar(value) {
        let mut path = prefix.clone();
        path.extend(rel.iter().cloned());
        found.push(path);
    }
}

fn check_uniform_candidates(style_value: &Value, prefix: &Path, found: &mut Vec<Path>) {
    let Some(Value::Mapping(uniforms)) =
        get_at_path(style_value, &[Step::Key("shaders".into()), Step::Key("uniforms".into())])
    else {
        return;
    };

    for (uniform_key, uniform_value) in uniforms {
        let Some(uniform_name) = uniform_key.as_str() else {
            continue;
        };
        let base_rel = [
            Step::Key("shaders".into()),
            Step::Key("uniforms".into()),
            Step::Key(uniform_name.into()),
        ];

        match uniform_value {
            Value::Sequence(seq) => {
                for (i, element) in seq.iter().enumerate() {
                    if is_texture_candidate_scalar(element) {
                        let mut path = prefix.clone();
                        path.extend(base_rel.iter().cloned());
                        path.push(Step::Index(i));
                        found.push(path);
                    }
                }
            }
            other => {
                if is_texture_candidate_scalar(other) {
                    let mut path = prefix.clone();
                    path.extend(base_rel.iter().cloned());
                    found.push(path);
                }
            }
        }
    }
}

/// A scalar is a texture candidate if it's a non-null string that doesn't
/// begin with `global.` and can't be parsed as a boolean or a number.
pub fn is_texture_candidate_scalar(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    if s.starts_with("global.") {
        return false;
    }
    if s.parse::<bool>().is_ok() || s.parse::<f64>().is_ok() {
        return false;
    }
    true
}

/// Returns a mapping with a helper constructor, used by tests.
#[cfg(test)]
pub fn mapping(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = Mapping::new();
    for (k, v) in pairs {
        map.insert(Value::String(k.to_string()), v);
    }
    Value::Mapping(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn takes_only_root_level_import_key() {
        let mut doc = yaml(
            r#"
            import: a.yaml
            nested:
              import: should-not-be-touched.yaml
            "#,
        );
        let imports = take_import_field(&mut doc);
        assert_eq!(imports, vec!["a.yaml".to_string()]);
        assert!(get_at_path(&doc, &[Step::Key("import".into())]).is_none());
        assert!(get_at_path(
            &doc,
            &[Step::Key("nested".into()), Step::Key("import".into())]
        )
        .is_some());
    }

    #[test]
    fn import_sequence_is_collected_in_order() {
        let mut doc = yaml("import: [a.yaml, b.yaml]");
        assert_eq!(
            take_import_field(&mut doc),
            vec!["a.yaml".to_string(), "b.yaml".to_string()]
        );
    }

    #[test]
    fn deep_merge_recurses_into_maps_and_overlay_wins_scalars() {
        let base = yaml("a: {x: 1, y: 2}");
        let overlay = yaml("a: {y: 3, z: 4}");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged, yaml("a: {x: 1, y: 3, z: 4}"));
    }

    #[test]
    fn finds_simple_texture_reference() {
        let doc = yaml(
            r#"
            styles:
              buildings:
                texture: "img/wall.png"
            "#,
        );
        let candidates = collect_texture_candidates(&doc);
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            get_at_path(&doc, &candidates[0]).unwrap().as_str(),
            Some("img/wall.png")
        );
    }

    #[test]
    fn named_texture_reference_is_still_a_candidate_before_rewrite_resolution() {
        let doc = yaml(
            r#"
            textures:
              pois:
                url: "img/poi.png"
            styles:
              markers:
                texture: pois
            "#,
        );
        let candidates = collect_texture_candidates(&doc);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn global_reference_and_literals_are_not_candidates() {
        let doc = yaml(
            r#"
            styles:
              roads:
                texture: "global.line_color"
                shaders:
                  uniforms:
                    u_width: "2.5"
                    u_flag: "true"
            "#,
        );
        assert!(collect_texture_candidates(&doc).is_empty());
    }
}
