use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use crate::domain::errors::DomainError;

pub const MAX_CONFIGURATION_KEY_LENGTH: usize = 80;
pub const MAX_SELECTION_EXPRESSION_LENGTH: usize = 500;

/// Per-recipient delivery channel settings for one system transport
/// configuration, selected at addressing time by rank and expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientTransportConfiguration {
    pub id: Ulid,
    /// Key of the system transport configuration this applies to. Unique per
    /// recipient.
    pub key: String,
    pub enabled: bool,
    /// Opaque vendor settings, e.g. `{"topic": …}` or `{"capCode": …}`.
    pub vendor_config: Value,
    /// Boolean selection rule. Absent means unconditionally selected.
    pub selection_expression: Option<String>,
    /// Higher ranks are evaluated first. Ties keep insertion order.
    pub rank: i32,
    /// Only meaningful on group-owned configurations: `Some(false)` stops
    /// member expansion once this configuration is selected.
    pub continue_in_hierarchy: Option<bool>,
    /// When false, a selection of this configuration stops evaluation of the
    /// recipient's remaining configurations.
    pub evaluate_other_configurations: bool,
}

impl RecipientTransportConfiguration {
    pub fn new(key: impl Into<String>, vendor_config: Value) -> Result<Self, DomainError> {
        let key = key.into();
        if key.is_empty() || key.len() > MAX_CONFIGURATION_KEY_LENGTH {
            return Err(DomainError::Validation(format!(
                "configuration key must be 1..={} characters, got {}",
                MAX_CONFIGURATION_KEY_LENGTH,
                key.len()
            )));
        }

        Ok(Self {
            id: Ulid::new(),
            key,
            enabled: true,
            vendor_config,
            selection_expression: None,
            rank: 0,
            continue_in_hierarchy: None,
            evaluate_other_configurations: true,
        })
    }

    pub fn set_selection_expression(
        &mut self,
        expression: impl Into<String>,
    ) -> Result<(), DomainError> {
        let expression = expression.into();
        if expression.len() > MAX_SELECTION_EXPRESSION_LENGTH {
            return Err(DomainError::Validation(format!(
                "selection expression exceeds {} characters",
                MAX_SELECTION_EXPRESSION_LENGTH
            )));
        }
        self.selection_expression = Some(expression);
        Ok(())
    }

    /// String field out of the vendor blob, with empty strings treated as
    /// absent.
    pub fn vendor_str(&self, field: &str) -> Option<String> {
        let value = self.vendor_config.get(field)?.as_str()?;
        if value.is_empty() {
            None
        } else {
            Some(value.to_owned())
        }
    }

    pub fn vendor_i64(&self, field: &str) -> Option<i64> {
        self.vendor_config.get(field)?.as_i64()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: Ulid,
    pub name: String,
    pub transport_configurations: Vec<RecipientTransportConfiguration>,
    /// Roles this person is delegated for. Back-reference only, never walked
    /// during resolution.
    pub role_ids: Vec<Ulid>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            name: name.into(),
            transport_configurations: Vec::new(),
            role_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Ulid,
    pub name: String,
    /// Used only while no individual is delegated.
    pub transport_configurations: Vec<RecipientTransportConfiguration>,
    pub delegate: Option<Ulid>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            name: name.into(),
            transport_configurations: Vec::new(),
            delegate: None,
        }
    }

    /// Binds the role to an individual. The person keeps a back-reference for
    /// display purposes.
    pub fn delegate_to(&mut self, person: &mut Person) {
        self.delegate = Some(person.id);
        if !person.role_ids.contains(&self.id) {
            person.role_ids.push(self.id);
        }
    }

    pub fn clear_delegation(&mut self, person: &mut Person) {
        self.delegate = None;
        person.role_ids.retain(|id| *id != self.id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Ulid,
    pub name: String,
    /// Group-owned configurations, evaluated before member expansion.
    pub transport_configurations: Vec<RecipientTransportConfiguration>,
    /// Member recipient ids of any variant, insertion-ordered. Membership is
    /// not ownership.
    pub member_ids: Vec<Ulid>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            name: name.into(),
            transport_configurations: Vec::new(),
            member_ids: Vec::new(),
        }
    }

    pub fn add_member(&mut self, member_id: Ulid) -> Result<(), DomainError> {
        if member_id == self.id {
            return Err(DomainError::Validation(format!(
                "group {} cannot be a member of itself",
                self.id
            )));
        }
        self.member_ids.push(member_id);
        Ok(())
    }

    pub fn remove_member(&mut self, member_id: Ulid) {
        self.member_ids.retain(|id| *id != member_id);
    }

    pub fn has_members(&self) -> bool {
        !self.member_ids.is_empty()
    }
}

/// Closed union of the addressable recipient kinds. Adding a kind requires
/// touching every match on this enum, which is intended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    Person(Person),
    Role(Role),
    Group(Group),
}

impl Recipient {
    pub fn id(&self) -> Ulid {
        match self {
            Recipient::Person(p) => p.id,
            Recipient::Role(r) => r.id,
            Recipient::Group(g) => g.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Recipient::Person(p) => &p.name,
            Recipient::Role(r) => &r.name,
            Recipient::Group(g) => &g.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Recipient::Person(_) => "person",
            Recipient::Role(_) => "role",
            Recipient::Group(_) => "group",
        }
    }

    pub fn transport_configurations(&self) -> &[RecipientTransportConfiguration] {
        match self {
            Recipient::Person(p) => &p.transport_configurations,
            Recipient::Role(r) => &r.transport_configurations,
            Recipient::Group(g) => &g.transport_configurations,
        }
    }

    fn transport_configurations_mut(&mut self) -> &mut Vec<RecipientTransportConfiguration> {
        match self {
            Recipient::Person(p) => &mut p.transport_configurations,
            Recipient::Role(r) => &mut r.transport_configurations,
            Recipient::Group(g) => &mut g.transport_configurations,
        }
    }

    pub fn has_transport_configurations(&self) -> bool {
        !self.transport_configurations().is_empty()
    }

    /// Configurations ordered by rank, highest first. The sort is stable, so
    /// equal ranks keep their insertion order.
    pub fn configurations_by_rank(&self) -> Vec<&RecipientTransportConfiguration> {
        let mut configurations: Vec<_> = self.transport_configurations().iter().collect();
        configurations.sort_by(|a, b| b.rank.cmp(&a.rank));
        configurations
    }

    /// The enabled configuration for the given transport key, if any.
    /// Disabled configurations are invisible here, matching evaluation.
    pub fn transport_configuration_for(
        &self,
        key: &str,
    ) -> Option<&RecipientTransportConfiguration> {
        self.transport_configurations()
            .iter()
            .find(|c| c.enabled && c.key == key)
    }

    pub fn add_transport_configuration(
        &mut self,
        configuration: RecipientTransportConfiguration,
    ) -> Result<(), DomainError> {
        if self
            .transport_configurations()
            .iter()
            .any(|c| c.key == configuration.key)
        {
            return Err(DomainError::AlreadyExists(format!(
                "transport configuration {} on recipient {}",
                configuration.key,
                self.id()
            )));
        }
        self.transport_configurations_mut().push(configuration);
        Ok(())
    }

    pub fn remove_transport_configuration(&mut self, key: &str) -> Result<(), DomainError> {
        let configurations = self.transport_configurations_mut();
        let before = configurations.len();
        configurations.retain(|c| c.key != key);
        if configurations.len() == before {
            return Err(DomainError::NotFound(format!(
                "transport configuration {key}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn configuration(key: &str, rank: i32) -> RecipientTransportConfiguration {
        let mut c = RecipientTransportConfiguration::new(key, json!({})).unwrap();
        c.rank = rank;
        c
    }

    #[test]
    fn group_rejects_itself_as_member() {
        let mut group = Group::new("on call");
        let own_id = group.id;

        assert!(matches!(
            group.add_member(own_id),
            Err(DomainError::Validation(_))
        ));
        assert!(!group.has_members());
    }

    #[test]
    fn duplicate_configuration_keys_are_rejected() {
        let mut person = Recipient::Person(Person::new("ada"));
        person
            .add_transport_configuration(configuration("ntfy-main", 0))
            .unwrap();

        let err = person
            .add_transport_configuration(configuration("ntfy-main", 5))
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists(_)));
        assert_eq!(person.transport_configurations().len(), 1);
    }

    #[test]
    fn configurations_are_ranked_highest_first_with_stable_ties() {
        let mut person = Recipient::Person(Person::new("ada"));
        person
            .add_transport_configuration(configuration("a", 1))
            .unwrap();
        person
            .add_transport_configuration(configuration("b", 5))
            .unwrap();
        person
            .add_transport_configuration(configuration("c", 3))
            .unwrap();
        person
            .add_transport_configuration(configuration("d", 3))
            .unwrap();

        let keys: Vec<_> = person
            .configurations_by_rank()
            .iter()
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn disabled_configurations_are_not_visible_by_key() {
        let mut person = Recipient::Person(Person::new("ada"));
        let mut c = configuration("pager-main", 0);
        c.enabled = false;
        person.add_transport_configuration(c).unwrap();

        assert!(person.transport_configuration_for("pager-main").is_none());
        assert!(person.has_transport_configurations());
    }

    #[test]
    fn delegation_keeps_the_back_reference_in_sync() {
        let mut person = Person::new("ada");
        let mut role = Role::new("duty officer");

        role.delegate_to(&mut person);
        assert_eq!(role.delegate, Some(person.id));
        assert_eq!(person.role_ids, vec![role.id]);

        role.clear_delegation(&mut person);
        assert_eq!(role.delegate, None);
        assert!(person.role_ids.is_empty());
    }

    #[test]
    fn overlong_configuration_keys_are_rejected() {
        let key = "k".repeat(MAX_CONFIGURATION_KEY_LENGTH + 1);
        assert!(RecipientTransportConfiguration::new(key, json!({})).is_err());
    }
}
