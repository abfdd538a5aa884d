//! Metadata policies.
//!
//! A policy's properties hold attribute rules. Role rules grant a built-in
//! role to users and groups; the permission rule lists, as derived
//! conditions, every role rule that grants anything. Rules reach their
//! siblings through a back-reference to the properties that own them.

use pathbind::v1::{
    AnyNode, Computed, Field, FieldValues, Node, Parent, Record, Result, build, node,
};
use serde_json::{Map, Value, json};
use std::rc::Rc;

pub const USER_MATCHER_NAME: &str = "principal.microsoft.id";
pub const GROUP_MATCHER_NAME: &str = "principal.microsoft.groups";
pub const DERIVED_ROLE_MATCHER_NAME: &str = "derived.purview.role";
pub const DERIVED_PERMISSION_MATCHER_NAME: &str = "derived.purview.permission";

/// Built-in role rules, in the order a permission rule lists them.
pub const ROLE_RULE_IDS: [&str; 7] = [
    "purviewmetadatarole_builtin_collection-administrator",
    "purviewmetadatarole_builtin_data-source-administrator",
    "purviewmetadatarole_builtin_data-curator",
    "purviewmetadatarole_builtin_purview-reader",
    "purviewmetadatarole_builtin_insights-reader",
    "purviewmetadatarole_builtin_policy-author",
    "purviewmetadatarole_builtin_workflow-administrator",
];

const ROLE_RULE_PREFIX: &str = "purviewmetadatarole";
const PERMISSION_RULE_PREFIX: &str = "permission";

/// The part of a rule id before the collection suffix.
fn id_prefix(rule_id: &str) -> &str {
    rule_id.split(':').next().unwrap_or(rule_id)
}

fn drop_nulls(mut tree: Value) -> Value {
    if let Some(map) = tree.as_object_mut() {
        map.retain(|_, value| !value.is_null());
    }
    tree
}

#[derive(Debug, Default)]
pub struct MetadataPolicy {
    pub id: String,
    pub name: String,
    pub properties: Node<MetadataPolicyProperties>,
    pub version: i64,
}

impl Record for MetadataPolicy {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("id", |p: &MetadataPolicy| &p.id),
            Field::new("name", |p: &MetadataPolicy| &p.name),
            Field::new("properties", |p: &MetadataPolicy| &p.properties),
            Field::new("version", |p: &MetadataPolicy| &p.version),
        ]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(MetadataPolicy {
            id: values.take("id")?,
            name: values.take("name")?,
            properties: values.take("properties")?,
            version: values.take("version")?,
        })
    }
}

#[derive(Debug, Default)]
pub struct MetadataPolicyProperties {
    pub description: String,
    pub decision_rules: Map<String, Value>,
    pub attribute_rules: Vec<Node<AttributeRule>>,
    pub collection: Map<String, Value>,
    pub parent_collection_name: Option<String>,
}

impl Record for MetadataPolicyProperties {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("description", |p: &MetadataPolicyProperties| &p.description),
            Field::new("decision_rules", |p: &MetadataPolicyProperties| {
                &p.decision_rules
            })
            .path("decisionRules"),
            Field::new("collection", |p: &MetadataPolicyProperties| &p.collection),
            Field::new("parent_collection_name", |p: &MetadataPolicyProperties| {
                &p.parent_collection_name
            })
            .path("parentCollectionName"),
        ]
    }

    fn computed() -> Vec<Computed<Self>> {
        vec![
            Computed::read_write(
                "attribute_rules",
                |p: &MetadataPolicyProperties| Some(p.rules_with_conditions()),
                |p, rules: Option<Vec<Node<AttributeRule>>>| {
                    p.attribute_rules = rules.unwrap_or_default();
                },
            )
            .path("attributeRules"),
        ]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(MetadataPolicyProperties {
            description: values.take_or_default("description")?,
            decision_rules: values.take_or_default("decision_rules")?,
            attribute_rules: Vec::new(),
            collection: values.take_or_default("collection")?,
            parent_collection_name: values.take("parent_collection_name")?,
        })
    }

    fn post_serialize(&self, tree: Value) -> Value {
        drop_nulls(tree)
    }
}

impl MetadataPolicyProperties {
    /// The name of the collection the policy governs.
    pub fn collection_name(&self) -> &str {
        self.collection
            .get("referenceName")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// The rule whose id shares `rule_id`'s prefix, if there is one.
    pub fn find_rule(&self, rule_id: &str) -> Option<Node<AttributeRule>> {
        let prefix = id_prefix(rule_id);
        self.attribute_rules
            .iter()
            .find(|rule| rule.borrow().id.starts_with(prefix))
            .cloned()
    }

    /// The rule whose id shares `rule_id`'s prefix, creating it for this
    /// policy's collection when missing.
    pub fn rule_by_id(
        properties: &Node<MetadataPolicyProperties>,
        rule_id: &str,
    ) -> Result<Node<AttributeRule>> {
        if let Some(rule) = properties.borrow().find_rule(rule_id) {
            return Ok(rule);
        }

        let id = format!("{}:{}", id_prefix(rule_id), properties.borrow().collection_name());
        tracing::debug!(rule = %id, "creating attribute rule");
        let owner = AnyNode::from(Rc::clone(properties));
        let rule = build::<AttributeRule>(
            &json!({"id": id, "name": id, "kind": "attributerule"}),
            Some(&owner),
        )?;
        properties
            .borrow_mut()
            .attribute_rules
            .push(Rc::clone(&rule));
        Ok(rule)
    }

    fn rules_with_conditions(&self) -> Vec<Node<AttributeRule>> {
        self.attribute_rules
            .iter()
            .filter(|rule| !rule.borrow().conditions.is_empty())
            .cloned()
            .collect()
    }
}

/// One attribute rule: a disjunction of conjunctions of matchers.
#[derive(Debug, Default)]
pub struct AttributeRule {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub conditions: Vec<Vec<Node<AttributeMatcher>>>,
    pub parent: Parent<MetadataPolicyProperties>,
}

impl Record for AttributeRule {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("id", |r: &AttributeRule| &r.id),
            Field::new("kind", |r: &AttributeRule| &r.kind),
            Field::new("name", |r: &AttributeRule| &r.name),
            Field::new("parent", |r: &AttributeRule| &r.parent),
        ]
    }

    fn computed() -> Vec<Computed<Self>> {
        vec![
            Computed::read_write(
                "conditions",
                |r: &AttributeRule| Some(r.effective_conditions()),
                |r, conditions: Option<Vec<Vec<Node<AttributeMatcher>>>>| {
                    r.conditions = conditions.unwrap_or_default();
                },
            )
            .path("dnfCondition"),
        ]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(AttributeRule {
            id: values.take("id")?,
            kind: values.take("kind")?,
            name: values.take("name")?,
            conditions: Vec::new(),
            parent: values.take("parent")?,
        })
    }

    /// A rule without conditions starts with an empty user condition and an
    /// empty group condition.
    fn post_init(&mut self) -> Result<()> {
        if self.conditions.is_empty() {
            let prefix = id_prefix(&self.id).to_string();
            self.conditions.push(users_condition(&prefix, Vec::new()));
            self.conditions.push(groups_condition(&prefix, Vec::new()));
        }
        Ok(())
    }
}

fn users_condition(rule_id: &str, users: Vec<String>) -> Vec<Node<AttributeMatcher>> {
    vec![
        node(AttributeMatcher::user(users)),
        node(AttributeMatcher::derived_role(rule_id)),
    ]
}

fn groups_condition(rule_id: &str, groups: Vec<String>) -> Vec<Node<AttributeMatcher>> {
    vec![
        node(AttributeMatcher::group(groups)),
        node(AttributeMatcher::derived_role(rule_id)),
    ]
}

impl AttributeRule {
    pub fn is_role_rule(&self) -> bool {
        self.id.starts_with(ROLE_RULE_PREFIX)
    }

    pub fn is_permission_rule(&self) -> bool {
        self.id.starts_with(PERMISSION_RULE_PREFIX)
    }

    pub fn users_matcher(&self) -> Option<Node<AttributeMatcher>> {
        self.find_matcher(AttributeMatcher::is_user_permission)
    }

    pub fn groups_matcher(&self) -> Option<Node<AttributeMatcher>> {
        self.find_matcher(AttributeMatcher::is_group_permission)
    }

    fn find_matcher(&self, pred: fn(&AttributeMatcher) -> bool) -> Option<Node<AttributeMatcher>> {
        self.conditions
            .iter()
            .flatten()
            .find(|matcher| pred(&matcher.borrow()))
            .cloned()
    }

    pub fn users(&self) -> Vec<String> {
        self.users_matcher()
            .map(|m| m.borrow().values().to_vec())
            .unwrap_or_default()
    }

    pub fn groups(&self) -> Vec<String> {
        self.groups_matcher()
            .map(|m| m.borrow().values().to_vec())
            .unwrap_or_default()
    }

    pub fn has_values(&self) -> bool {
        !self.users().is_empty() || !self.groups().is_empty()
    }

    /// Grant the rule to a user. A rule with no user matcher is unchanged.
    pub fn add_user(&mut self, object_id: &str) {
        if let Some(matcher) = self.users_matcher() {
            matcher.borrow_mut().add_value_included_in(object_id);
        }
    }

    /// Grant the rule to a group. A rule with no group matcher is unchanged.
    pub fn add_group(&mut self, object_id: &str) {
        if let Some(matcher) = self.groups_matcher() {
            matcher.borrow_mut().add_value_included_in(object_id);
        }
    }

    /// The conditions written out for this rule.
    ///
    /// A role rule emits a user condition and a group condition, each only
    /// when it has values. A permission rule emits one derived condition per
    /// built-in role rule of its policy that grants anything.
    pub fn effective_conditions(&self) -> Vec<Vec<Node<AttributeMatcher>>> {
        if self.is_role_rule() {
            let prefix = id_prefix(&self.id);
            let mut conditions = Vec::new();
            let users = self.users();
            if !users.is_empty() {
                conditions.push(users_condition(prefix, users));
            }
            let groups = self.groups();
            if !groups.is_empty() {
                conditions.push(groups_condition(prefix, groups));
            }
            return conditions;
        }

        if self.is_permission_rule() {
            let Some(properties) = self.parent.upgrade() else {
                return Vec::new();
            };
            let properties = properties.borrow();
            return ROLE_RULE_IDS
                .iter()
                .filter_map(|id| properties.find_rule(id))
                .filter(|rule| rule.borrow().has_values())
                .map(|rule| {
                    vec![node(AttributeMatcher::derived_permission(
                        &rule.borrow().id,
                    ))]
                })
                .collect();
        }

        Vec::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMatcher {
    pub attribute_name: String,
    pub from_rule: Option<String>,
    pub value_includes: Option<String>,
    pub value_included_in: Option<Vec<String>>,
    pub value_excludes: Option<String>,
    pub value_excluded_in: Option<Vec<String>>,
}

impl Record for AttributeMatcher {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("attribute_name", |m: &AttributeMatcher| &m.attribute_name)
                .path("attributeName"),
            Field::new("from_rule", |m: &AttributeMatcher| &m.from_rule).path("fromRule"),
            Field::new("value_includes", |m: &AttributeMatcher| &m.value_includes)
                .path("attributeValueIncludes"),
            Field::new("value_included_in", |m: &AttributeMatcher| {
                &m.value_included_in
            })
            .path("attributeValueIncludedIn"),
            Field::new("value_excludes", |m: &AttributeMatcher| &m.value_excludes)
                .path("attributeValueExcludes"),
            Field::new("value_excluded_in", |m: &AttributeMatcher| {
                &m.value_excluded_in
            })
            .path("attributeValueExcludedIn"),
        ]
    }

    fn construct(values: &mut FieldValues) -> Result<Self> {
        Ok(AttributeMatcher {
            attribute_name: values.take("attribute_name")?,
            from_rule: values.take("from_rule")?,
            value_includes: values.take("value_includes")?,
            value_included_in: values.take("value_included_in")?,
            value_excludes: values.take("value_excludes")?,
            value_excluded_in: values.take("value_excluded_in")?,
        })
    }

    fn post_serialize(&self, tree: Value) -> Value {
        drop_nulls(tree)
    }
}

impl AttributeMatcher {
    pub fn user(users: Vec<String>) -> Self {
        AttributeMatcher {
            attribute_name: USER_MATCHER_NAME.to_string(),
            value_included_in: Some(users),
            ..AttributeMatcher::default()
        }
    }

    pub fn group(groups: Vec<String>) -> Self {
        AttributeMatcher {
            attribute_name: GROUP_MATCHER_NAME.to_string(),
            value_included_in: Some(groups),
            ..AttributeMatcher::default()
        }
    }

    pub fn derived_role(rule_id: &str) -> Self {
        AttributeMatcher::derived(DERIVED_ROLE_MATCHER_NAME, rule_id)
    }

    pub fn derived_permission(rule_id: &str) -> Self {
        AttributeMatcher::derived(DERIVED_PERMISSION_MATCHER_NAME, rule_id)
    }

    fn derived(attribute_name: &str, rule_id: &str) -> Self {
        AttributeMatcher {
            attribute_name: attribute_name.to_string(),
            from_rule: Some(rule_id.to_string()),
            value_includes: Some(rule_id.to_string()),
            ..AttributeMatcher::default()
        }
    }

    pub fn is_user_permission(&self) -> bool {
        self.attribute_name == USER_MATCHER_NAME
    }

    pub fn is_group_permission(&self) -> bool {
        self.attribute_name == GROUP_MATCHER_NAME
    }

    pub fn values(&self) -> &[String] {
        self.value_included_in.as_deref().unwrap_or_default()
    }

    /// Add `value` to the included values unless it is already there.
    pub fn add_value_included_in(&mut self, value: &str) {
        let values = self.value_included_in.get_or_insert_with(Vec::new);
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
}
