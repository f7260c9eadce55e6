//! List combinators
//!
//! Each combinator exists as a plain list function and as a stage
//! constructor returning a [`SharedStage`].

use crate::entity::{Entity, ID};
use crate::error::{Error, Result};
use crate::stage::{FnStage, SharedStage};
use futures::future::join_all;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, warn};

/// Copy attribute `from` to `to` on every entity.
///
/// A missing `from` removes `to`. Entities whose `id` would be removed are
/// dropped, since an entity cannot exist without one.
pub fn set_attr(input: Vec<Entity>, from: &str, to: &str) -> Vec<Entity> {
    input
        .into_iter()
        .filter_map(|entity| {
            let updated = entity.assign(to, entity.get(from));
            if updated.is_none() {
                debug!(from, id = %entity.id(), "Dropping entity: copied value is not a valid id");
            }
            updated
        })
        .collect()
}

/// Assign a literal value to `key` on every entity
pub fn set_value(input: Vec<Entity>, key: &str, value: &Value) -> Vec<Entity> {
    input
        .into_iter()
        .filter_map(|entity| entity.assign(key, Some(value.clone())))
        .collect()
}

/// First `n` entities in upstream order
pub fn take_first(mut input: Vec<Entity>, n: usize) -> Vec<Entity> {
    input.truncate(n);
    input
}

/// Hashable identity of an attribute value.
///
/// Numbers compare by value (`1` and `1.0` are one key); strings never
/// collide with numbers.
fn dedupe_key(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
            Some(f) => f.to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Keep the first occurrence of each distinct value of `by`.
///
/// Entities missing `by` share a single "absent" key.
pub fn dedupe_by(input: Vec<Entity>, by: &str) -> Vec<Entity> {
    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(input.len());
    input
        .into_iter()
        .filter(|entity| seen.insert(entity.get(by).as_ref().map(dedupe_key)))
        .collect()
}

/// Full random permutation
pub fn shuffle(mut input: Vec<Entity>) -> Vec<Entity> {
    input.shuffle(&mut rand::thread_rng());
    input
}

/// Stable ascending sort by attribute `by`
pub fn sort_by_attr(mut input: Vec<Entity>, by: &str) -> Vec<Entity> {
    input.sort_by(|a, b| compare_values(a.get(by).as_ref(), b.get(by).as_ref()));
    input
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_)) | Some(Value::Object(_)) => 5,
    }
}

/// Total order over attribute values: absent < null < bool < number < string < other
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

pub fn set(from: &str, to: &str) -> SharedStage {
    let (from, to) = (from.to_string(), to.to_string());
    FnStage::shared(format!("set({},{})", from, to), move |input| set_attr(input, &from, &to))
}

pub fn set_val(key: &str, value: impl Into<Value>) -> SharedStage {
    let key = key.to_string();
    let value = value.into();
    FnStage::shared(format!("set_val({})", key), move |input| set_value(input, &key, &value))
}

pub fn take(n: usize) -> SharedStage {
    FnStage::shared(format!("take({})", n), move |input| take_first(input, n))
}

pub fn dedupe(by: &str) -> SharedStage {
    let by = by.to_string();
    FnStage::shared(format!("dedupe({})", by), move |input| dedupe_by(input, &by))
}

/// Shuffle the list. `by` names the origin attribute but does not affect the
/// permutation.
pub fn diversify(by: &str) -> SharedStage {
    FnStage::shared(format!("diversify({})", by), shuffle)
}

pub fn sort(by: &str) -> SharedStage {
    let by = by.to_string();
    FnStage::shared(format!("sort({})", by), move |input| sort_by_attr(input, &by))
}

/// Settled result of one merge branch
#[derive(Debug)]
pub enum BranchOutcome {
    Fulfilled(Vec<Entity>),
    Rejected(Error),
}

impl From<Result<Vec<Entity>>> for BranchOutcome {
    fn from(result: Result<Vec<Entity>>) -> Self {
        match result {
            Ok(entities) => BranchOutcome::Fulfilled(entities),
            Err(e) => BranchOutcome::Rejected(e),
        }
    }
}

/// Concatenate fulfilled branches in declaration order, discarding rejected ones.
///
/// Structural (configuration) errors are not discarded: the first one is
/// returned to the caller.
pub fn collect_successes(outcomes: Vec<BranchOutcome>) -> Result<Vec<Entity>> {
    let mut merged = Vec::new();
    for (branch, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            BranchOutcome::Fulfilled(entities) => merged.extend(entities),
            BranchOutcome::Rejected(e) if e.is_structural() => return Err(e),
            BranchOutcome::Rejected(e) => {
                warn!(branch, error = %e, "Merge branch failed (discarded)");
            }
        }
    }
    Ok(merged)
}

/// Await every branch (full barrier) and merge the successful outputs
pub async fn merge<I, F>(branches: I) -> Result<Vec<Entity>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<Vec<Entity>>>,
{
    let outcomes = join_all(branches)
        .await
        .into_iter()
        .map(BranchOutcome::from)
        .collect();
    collect_successes(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FlowContext;
    use crate::stage::Stage;
    use futures::FutureExt;
    use serde_json::json;

    fn ids(entities: &[Entity]) -> Vec<Value> {
        entities.iter().map(|e| e.get(ID).unwrap()).collect()
    }

    #[test]
    fn test_set_copies_attribute() {
        let output = set_attr(vec![Entity::new("A")], "id", "recommender");
        assert_eq!(output[0].get("recommender"), Some(json!("A")));
        assert_eq!(output[0].id(), &crate::entity::EntityId::from("A"));
    }

    #[test]
    fn test_set_missing_from_removes_to() {
        let input = vec![Entity::new(1).with_attr("recommender", 7)];
        let output = set_attr(input, "missing", "recommender");
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].get("recommender"), None);
    }

    #[test]
    fn test_set_missing_into_id_drops_entity() {
        let input = vec![Entity::new(1), Entity::new(2).with_attr("alt", 20)];
        let output = set_attr(input, "alt", ID);
        assert_eq!(ids(&output), vec![json!(20)]);
    }

    #[test]
    fn test_set_value() {
        let output = set_value(vec![Entity::new(1), Entity::new(2)], "flow", &json!("song"));
        assert!(output.iter().all(|e| e.get("flow") == Some(json!("song"))));
    }

    #[test]
    fn test_take() {
        let input: Vec<Entity> = (1..=5).map(Entity::new).collect();
        assert_eq!(take_first(input.clone(), 2).len(), 2);
        assert_eq!(take_first(input.clone(), 10).len(), 5);
        assert!(take_first(input.clone(), 0).is_empty());

        // take(n) then take(m) == take(min(n, m))
        for (n, m) in [(3, 1), (1, 3), (0, 4), (6, 2)] {
            let twice = take_first(take_first(input.clone(), n), m);
            assert_eq!(twice, take_first(input.clone(), n.min(m)));
        }
    }

    #[test]
    fn test_dedupe_keeps_first_seen() {
        let input = vec![
            Entity::new(1).with_attr("recommender", "a"),
            Entity::new(2).with_attr("recommender", "b"),
            Entity::new(1).with_attr("recommender", "c"),
            Entity::new(3),
        ];
        let output = dedupe_by(input, ID);
        assert_eq!(ids(&output), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(output[0].get("recommender"), Some(json!("a")));

        // Idempotent
        assert_eq!(dedupe_by(output.clone(), ID), output);
    }

    #[test]
    fn test_dedupe_distinguishes_numbers_and_strings() {
        let output = dedupe_by(vec![Entity::new(1), Entity::new("1")], ID);
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn test_dedupe_compares_numbers_by_value() {
        let input = vec![
            Entity::new(1).with_attr("k", 1),
            Entity::new(2).with_attr("k", 1.0),
            Entity::new(3).with_attr("k", 1.5),
            Entity::new(4).with_attr("k", "1"),
        ];
        let output = dedupe_by(input, "k");
        assert_eq!(ids(&output), vec![json!(1), json!(3), json!(4)]);
    }

    #[test]
    fn test_dedupe_missing_attribute_collapses() {
        let output = dedupe_by(vec![Entity::new(1), Entity::new(2)], "genre");
        assert_eq!(ids(&output), vec![json!(1)]);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let input: Vec<Entity> = (1..=20).map(Entity::new).collect();
        let mut output = shuffle(input.clone());
        assert_eq!(output.len(), input.len());
        output.sort_by_key(|e| e.id().as_int());
        assert_eq!(output, input);
    }

    #[test]
    fn test_sort_is_stable_and_ascending() {
        let input = vec![
            Entity::new(1).with_attr("length", 300),
            Entity::new(2).with_attr("length", 147),
            Entity::new(3).with_attr("length", 300),
            Entity::new(4),
            Entity::new(5).with_attr("length", 258.5),
        ];
        let output = sort_by_attr(input, "length");
        assert_eq!(ids(&output), vec![json!(4), json!(2), json!(5), json!(1), json!(3)]);
    }

    #[tokio::test]
    async fn test_merge_discards_failed_branches() {
        let ok = async { Ok::<_, Error>(vec![Entity::new(1), Entity::new(2)]) };
        let failing = async { Err::<Vec<Entity>, _>(Error::stage("similar", "redis down")) };
        let also_ok = async { Ok::<_, Error>(vec![Entity::new(3)]) };

        let merged = merge(vec![ok.boxed(), failing.boxed(), also_ok.boxed()])
            .await
            .unwrap();
        assert_eq!(ids(&merged), vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn test_merge_propagates_structural_errors() {
        let ok = async { Ok::<_, Error>(vec![Entity::new(1)]) };
        let misconfigured =
            async { Err::<Vec<Entity>, _>(Error::Config("missing index_name".to_string())) };

        let result = merge(vec![ok.boxed(), misconfigured.boxed()]).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_combinator_stages() {
        let input = vec![Entity::new(2), Entity::new(1), Entity::new(2)];
        let output = dedupe(ID).run(input, &FlowContext::new()).await.unwrap();
        let output = sort(ID).run(output, &FlowContext::new()).await.unwrap();
        let output = take(1).run(output, &FlowContext::new()).await.unwrap();
        assert_eq!(ids(&output), vec![json!(1)]);
        assert_eq!(diversify("recommender").name(), "diversify(recommender)");
    }
}
