//! Composition helpers shared by every dialect

use std::collections::HashSet;

use super::schema::{LogicalOperator, SchemaObject, SchemaShape, SchemaType};

/// Attach `items` to `schema`.
///
/// - no items: unchanged
/// - tuples always keep their items as positions
/// - several items become a deduplicated composition
/// - a single item is merged over the schema when `mutate_one` is set
pub fn add_items_to_schema(
    mut schema: SchemaObject,
    items: Vec<SchemaObject>,
    operator: LogicalOperator,
    mutate_one: bool,
) -> SchemaObject {
    if items.is_empty() {
        return schema;
    }

    if schema.is_type(SchemaType::Tuple) {
        schema.items = Some(items);
        return schema;
    }

    if items.len() != 1 {
        schema.items = Some(items);
        schema.logical_operator = Some(operator);
        return deduplicate_schema(schema);
    }

    if mutate_one {
        let mut items = items;
        if let Some(item) = items.pop() {
            return schema.overlay(item);
        }
        return schema;
    }

    schema.items = Some(items);
    schema
}

/// Signature of a member for duplicate detection. `const` and `format` are
/// namespaced so an empty string does not collide with a missing value.
fn member_signature(item: &SchemaObject) -> String {
    let constant = item
        .const_value
        .as_ref()
        .map(|c| format!("const-{}", c))
        .unwrap_or_default();
    let format = item
        .format
        .as_ref()
        .map(|f| format!("format-{}", f))
        .unwrap_or_default();

    let number = |n: &Option<serde_json::Number>| n.as_ref().map(ToString::to_string).unwrap_or_default();
    let count = |n: &Option<u64>| n.map(|v| v.to_string()).unwrap_or_default();

    let constraints = [
        count(&item.min_length),
        count(&item.max_length),
        number(&item.minimum),
        number(&item.maximum),
        number(&item.exclusive_minimum),
        number(&item.exclusive_maximum),
        item.pattern.clone().unwrap_or_default(),
    ]
    .join("|");

    format!(
        "{}{}{}{}{}",
        item.reference.as_deref().unwrap_or_default(),
        item.schema_type.map(|t| t.as_str()).unwrap_or_default(),
        constant,
        format,
        constraints
    )
}

/// Drop duplicate primitive members and lift a lone survivor.
///
/// Nested compositions and tuple positions are never deduplicated. After
/// deduplication a single remaining member is merged into the parent unless
/// the parent is an array, enum or tuple. An `unknown` result has no
/// constraints left and becomes `{}`.
pub fn deduplicate_schema(mut schema: SchemaObject) -> SchemaObject {
    let Some(items) = schema.items.take() else {
        return schema;
    };

    let parent_is_tuple = schema.is_type(SchemaType::Tuple);
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(items.len());

    for item in items {
        let nested = item.schema_type.is_none() && item.items.is_some();
        if nested || parent_is_tuple {
            unique.push(item);
            continue;
        }
        if item.schema_type.map_or(true, |t| t.is_primitive()) {
            if seen.insert(member_signature(&item)) {
                unique.push(item);
            }
            continue;
        }
        unique.push(item);
    }

    let keeps_items = schema.schema_type.is_some_and(|t| t.holds_items());
    if unique.len() <= 1 && !keeps_items {
        schema.logical_operator = None;
        if let Some(lifted) = unique.pop() {
            schema = schema.overlay(lifted);
        }
    } else {
        schema.items = Some(unique);
    }

    if schema.is_type(SchemaType::Unknown) {
        return SchemaObject::default();
    }
    schema
}

/// Collapse an `and` composition into a single object view.
///
/// `$ref` members are looked up through `resolve`; their `omit` lists
/// remove properties contributed by the referenced schema. Properties from
/// later members win. Anything that is not an intersection is returned as is.
pub fn flatten_intersection<'a, F>(schema: &'a SchemaObject, resolve: F) -> SchemaObject
where
    F: Fn(&str) -> Option<&'a SchemaObject>,
{
    let mut visiting = HashSet::new();
    match flatten_into(schema, &resolve, &mut visiting) {
        Some(flat) => flat,
        None => schema.clone(),
    }
}

fn flatten_into<'a, F>(
    schema: &'a SchemaObject,
    resolve: &F,
    visiting: &mut HashSet<&'a str>,
) -> Option<SchemaObject>
where
    F: Fn(&str) -> Option<&'a SchemaObject>,
{
    let SchemaShape::Composition {
        items,
        operator: LogicalOperator::And,
    } = schema.shape()
    else {
        return None;
    };

    let mut flat = SchemaObject {
        description: schema.description.clone(),
        title: schema.title.clone(),
        deprecated: schema.deprecated,
        ..SchemaObject::with_type(SchemaType::Object)
    };

    for item in items {
        let member = match &item.reference {
            Some(reference) => {
                if !visiting.insert(reference.as_str()) {
                    continue;
                }
                let target = resolve(reference);
                let expanded = target.map(|t| flatten_into(t, resolve, visiting).unwrap_or_else(|| t.clone()));
                visiting.remove(reference.as_str());
                let Some(mut expanded) = expanded else {
                    continue;
                };
                if let (Some(omit), Some(properties)) = (&item.omit, expanded.properties.as_mut()) {
                    properties.retain(|name, _| !omit.contains(name));
                }
                if let Some(required) = item.required.as_ref() {
                    for name in required {
                        expanded.add_required(name);
                    }
                }
                expanded
            }
            None => flatten_into(item, resolve, visiting).unwrap_or_else(|| item.clone()),
        };

        if let Some(properties) = member.properties {
            flat.properties
                .get_or_insert_with(Default::default)
                .extend(properties);
        }
        for name in member.required.into_iter().flatten() {
            flat.add_required(&name);
        }
        if member.additional_properties.is_some() {
            flat.additional_properties = member.additional_properties;
        }
    }

    Some(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn string() -> SchemaObject {
        SchemaObject::with_type(SchemaType::String)
    }

    #[test]
    fn test_add_items_empty_is_noop() {
        let schema = SchemaObject::with_type(SchemaType::Array);
        assert_eq!(
            add_items_to_schema(schema.clone(), vec![], LogicalOperator::Or, false),
            schema
        );
    }

    #[test]
    fn test_add_items_tuple_keeps_positions() {
        let schema = SchemaObject::with_type(SchemaType::Tuple);
        let result = add_items_to_schema(schema, vec![string(), string()], LogicalOperator::Or, false);
        assert_eq!(result.items.as_ref().map(Vec::len), Some(2));
        assert!(result.logical_operator.is_none());
    }

    #[test]
    fn test_add_items_single_item() {
        let schema = SchemaObject {
            description: Some("wrapper".into()),
            ..Default::default()
        };
        let merged = add_items_to_schema(schema.clone(), vec![string()], LogicalOperator::And, true);
        assert_eq!(merged.schema_type, Some(SchemaType::String));
        assert_eq!(merged.description.as_deref(), Some("wrapper"));
        assert!(merged.items.is_none());

        let array = add_items_to_schema(
            SchemaObject::with_type(SchemaType::Array),
            vec![string()],
            LogicalOperator::Or,
            false,
        );
        assert_eq!(array.items, Some(vec![string()]));
    }

    #[test]
    fn test_duplicate_members_collapse_and_lift() {
        let result = add_items_to_schema(
            SchemaObject::default(),
            vec![string(), string()],
            LogicalOperator::Or,
            false,
        );
        assert_eq!(result, string());
        assert!(result.items.is_none());
        assert!(result.logical_operator.is_none());
    }

    #[test]
    fn test_dedup_distinguishes_const_and_format() {
        let result = add_items_to_schema(
            SchemaObject::default(),
            vec![
                SchemaObject::constant(SchemaType::String, json!("")),
                string(),
                SchemaObject {
                    format: Some("uuid".into()),
                    ..string()
                },
                SchemaObject::constant(SchemaType::String, json!("")),
            ],
            LogicalOperator::Or,
            false,
        );
        assert_eq!(result.items.as_ref().map(Vec::len), Some(3));
        assert_eq!(result.logical_operator, Some(LogicalOperator::Or));
    }

    #[test]
    fn test_dedup_keeps_nested_and_object_members() {
        let nested = SchemaObject::composition(vec![string(), SchemaObject::null()], LogicalOperator::Or);
        let object = SchemaObject::with_type(SchemaType::Object);
        let result = add_items_to_schema(
            SchemaObject::default(),
            vec![nested.clone(), nested.clone(), object.clone(), object.clone()],
            LogicalOperator::And,
            false,
        );
        assert_eq!(result.items.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_dedup_refs() {
        let a = SchemaObject::reference("#/components/schemas/A");
        let result = add_items_to_schema(SchemaObject::default(), vec![a.clone(), a.clone()], LogicalOperator::Or, false);
        assert_eq!(result, a);
    }

    #[test]
    fn test_enum_keeps_single_item() {
        let schema = SchemaObject {
            items: Some(vec![
                SchemaObject::constant(SchemaType::String, json!("a")),
                SchemaObject::constant(SchemaType::String, json!("a")),
            ]),
            logical_operator: Some(LogicalOperator::Or),
            ..SchemaObject::with_type(SchemaType::Enum)
        };
        let result = deduplicate_schema(schema);
        assert_eq!(result.schema_type, Some(SchemaType::Enum));
        assert_eq!(result.items.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_lifted_unknown_becomes_empty() {
        let schema = SchemaObject {
            description: Some("anything".into()),
            items: Some(vec![SchemaObject::unknown(), SchemaObject::unknown()]),
            logical_operator: Some(LogicalOperator::Or),
            ..Default::default()
        };
        assert!(deduplicate_schema(schema).is_empty());
    }

    #[test]
    fn test_flatten_intersection_merges_referenced_properties() {
        let mut bar_props = IndexMap::new();
        bar_props.insert("y".to_string(), SchemaObject::with_type(SchemaType::Number));
        bar_props.insert("kind".to_string(), string());
        let bar = SchemaObject {
            properties: Some(bar_props),
            required: Some(vec!["y".into()]),
            ..SchemaObject::with_type(SchemaType::Object)
        };

        let mut foo_props = IndexMap::new();
        foo_props.insert("x".to_string(), string());
        let mut bar_ref = SchemaObject::reference("#/components/schemas/Bar");
        bar_ref.add_omit("kind");
        let foo = SchemaObject::composition(
            vec![
                bar_ref,
                SchemaObject {
                    properties: Some(foo_props),
                    ..SchemaObject::with_type(SchemaType::Object)
                },
            ],
            LogicalOperator::And,
        );

        let flat = flatten_intersection(&foo, |r| (r == "#/components/schemas/Bar").then_some(&bar));
        assert_eq!(flat.schema_type, Some(SchemaType::Object));
        let names: Vec<&str> = flat.properties.as_ref().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["y", "x"]);
        assert_eq!(flat.required, Some(vec!["y".to_string()]));
    }

    #[test]
    fn test_flatten_intersection_survives_self_reference() {
        let node = SchemaObject::composition(
            vec![
                SchemaObject::reference("#/components/schemas/Node"),
                SchemaObject::with_type(SchemaType::Object),
            ],
            LogicalOperator::And,
        );
        let flat = flatten_intersection(&node, |_| Some(&node));
        assert_eq!(flat.schema_type, Some(SchemaType::Object));
    }
}
