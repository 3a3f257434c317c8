//! RFC 6902 ("JSON Patch") subset differ: `add`/`replace`/`remove` only, no
//! `move`/`copy`/`test`, and no key escaping since every key this
//! orchestrator ever diffs is fixed vocabulary containing neither `/` nor
//! `~`.

use serde_json::{Value, json};

/// Compute the ordered list of patch operations that transform `source`
/// into `target`.
///
/// Identical values short-circuit to an empty patch. A kind mismatch (e.g.
/// object vs. number) emits a single `replace` at `path`. Objects diff by
/// key: keys present in `source` but missing from `target` are removed,
/// keys present in both recurse, keys only in `target` are added. Arrays
/// diff positionally: the common prefix recurses index-by-index, any
/// extra `source` elements are removed from the highest index down (so
/// earlier removals don't shift later indices out from under later ops),
/// and any extra `target` elements are appended via the `/-` pointer.
#[must_use]
pub fn json_diff(source: &Value, target: &Value) -> Vec<Value> {
    let mut result = Vec::new();
    diff_into(source, target, "", &mut result);
    result
}

fn diff_into(source: &Value, target: &Value, path: &str, out: &mut Vec<Value>) {
    if source == target {
        return;
    }

    if std::mem::discriminant(source) != std::mem::discriminant(target) {
        out.push(replace_op(path, target));
        return;
    }

    match (source, target) {
        (Value::Array(src), Value::Array(tgt)) => diff_array(src, tgt, path, out),
        (Value::Object(src), Value::Object(tgt)) => diff_object(src, tgt, path, out),
        _ => out.push(replace_op(path, target)),
    }
}

fn diff_array(src: &[Value], tgt: &[Value], path: &str, out: &mut Vec<Value>) {
    let common = src.len().min(tgt.len());
    for i in 0..common {
        diff_into(&src[i], &tgt[i], &format!("{path}/{i}"), out);
    }

    for i in (tgt.len()..src.len()).rev() {
        out.push(json!({"op": "remove", "path": format!("{path}/{i}")}));
    }

    for value in &tgt[common..] {
        out.push(json!({"op": "add", "path": format!("{path}/-"), "value": value}));
    }
}

fn diff_object(
    src: &serde_json::Map<String, Value>,
    tgt: &serde_json::Map<String, Value>,
    path: &str,
    out: &mut Vec<Value>,
) {
    for (key, src_value) in src {
        let key_path = format!("{path}/{key}");
        match tgt.get(key) {
            Some(tgt_value) => diff_into(src_value, tgt_value, &key_path, out),
            None => out.push(json!({"op": "remove", "path": key_path})),
        }
    }

    for (key, tgt_value) in tgt {
        if !src.contains_key(key) {
            out.push(json!({"op": "add", "path": format!("{path}/{key}"), "value": tgt_value}));
        }
    }
}

fn replace_op(path: &str, value: &Value) -> Value {
    json!({"op": "replace", "path": path, "value": value})
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_values_produce_empty_patch() {
        let v = json!({"a": 1, "b": [1, 2, {"c": true}]});
        assert!(json_diff(&v, &v).is_empty());
    }

    #[test]
    fn object_replace_and_add() {
        let source = json!({"a": 1, "b": 2});
        let target = json!({"a": 1, "b": 3, "c": 4});
        let patch = json_diff(&source, &target);
        assert_eq!(
            patch,
            vec![
                json!({"op": "replace", "path": "/b", "value": 3}),
                json!({"op": "add", "path": "/c", "value": 4}),
            ]
        );
    }

    #[test]
    fn object_remove_key() {
        let source = json!({"a": 1, "b": 2});
        let target = json!({"a": 1});
        let patch = json_diff(&source, &target);
        assert_eq!(patch, vec![json!({"op": "remove", "path": "/b"})]);
    }

    #[test]
    fn array_shrink_removes_from_the_end_descending() {
        let patch = json_diff(&json!([1, 2, 3]), &json!([1, 2]));
        assert_eq!(patch, vec![json!({"op": "remove", "path": "/2"})]);
    }

    #[test]
    fn array_grow_appends_with_dash_pointer() {
        let patch = json_diff(&json!([1, 2]), &json!([1, 2, 3]));
        assert_eq!(patch, vec![json!({"op": "add", "path": "/-", "value": 3})]);
    }

    #[test]
    fn array_grow_by_several_appends_every_new_element() {
        let patch = json_diff(&json!([1]), &json!([1, 2, 3, 4]));
        assert_eq!(
            patch,
            vec![
                json!({"op": "add", "path": "/-", "value": 2}),
                json!({"op": "add", "path": "/-", "value": 3}),
                json!({"op": "add", "path": "/-", "value": 4}),
            ]
        );
    }

    #[test]
    fn array_shrink_by_several_removes_highest_index_first() {
        let patch = json_diff(&json!([1, 2, 3, 4]), &json!([1]));
        assert_eq!(
            patch,
            vec![
                json!({"op": "remove", "path": "/3"}),
                json!({"op": "remove", "path": "/2"}),
                json!({"op": "remove", "path": "/1"}),
            ]
        );
    }

    #[test]
    fn kind_mismatch_emits_single_replace() {
        let patch = json_diff(&json!({"a": 1}), &json!([1, 2]));
        assert_eq!(patch, vec![json!({"op": "replace", "path": "", "value": [1, 2]})]);
    }

    fn apply(source: &Value, patch: &[Value]) -> Value {
        let mut out = source.clone();
        for op in patch {
            let pointer = op["path"].as_str().unwrap();
            match op["op"].as_str().unwrap() {
                "remove" => remove_at(&mut out, pointer),
                "replace" => {
                    if let Some(slot) = out.pointer_mut(pointer) {
                        *slot = op["value"].clone();
                    }
                }
                "add" => add_at(&mut out, pointer, op["value"].clone()),
                other => panic!("unexpected op {other}"),
            }
        }
        out
    }

    fn remove_at(root: &mut Value, pointer: &str) {
        let (parent_ptr, key) = pointer.rsplit_once('/').unwrap();
        let parent = if parent_ptr.is_empty() {
            root
        } else {
            root.pointer_mut(parent_ptr).unwrap()
        };
        match parent {
            Value::Object(map) => {
                map.remove(key);
            }
            Value::Array(arr) => {
                arr.remove(key.parse::<usize>().unwrap());
            }
            _ => panic!("remove target is not a container"),
        }
    }

    fn add_at(root: &mut Value, pointer: &str, value: Value) {
        let (parent_ptr, key) = pointer.rsplit_once('/').unwrap();
        let parent = if parent_ptr.is_empty() {
            root
        } else {
            root.pointer_mut(parent_ptr).unwrap()
        };
        match parent {
            Value::Object(map) => {
                map.insert(key.to_string(), value);
            }
            Value::Array(arr) => {
                if key == "-" {
                    arr.push(value);
                } else {
                    arr.insert(key.parse::<usize>().unwrap(), value);
                }
            }
            _ => panic!("add target is not a container"),
        }
    }

    #[test]
    fn applying_patch_reproduces_target_for_assorted_fixtures() {
        let cases = [
            (json!({"a": 1, "b": 2}), json!({"a": 1, "b": 3, "c": 4})),
            (json!([1, 2, 3]), json!([1, 2])),
            (json!([1, 2]), json!([1, 2, 3])),
            (
                json!({"torrents": [{"info_hash": "a"}]}),
                json!({"torrents": [{"info_hash": "a"}, {"info_hash": "b"}]}),
            ),
        ];
        for (source, target) in cases {
            let patch = json_diff(&source, &target);
            assert_eq!(apply(&source, &patch), target);
        }
    }
}
