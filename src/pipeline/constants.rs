//! Roster loading from the constants query

use super::types::{Hero, HeroMatchups, PrimaryAttribute, Role, Roster};
use crate::stratz::queries::{ConstantsData, ConstantsHero, QUERY_HEROES};
use crate::stratz::{ApiError, RateLimitedClient};
use std::collections::BTreeMap;

/// Fetch the full roster in one call
pub async fn load_roster(client: &RateLimitedClient) -> Result<Roster, ApiError> {
    let data: ConstantsData = client
        .request(QUERY_HEROES, serde_json::Value::Null, "Constants")
        .await?;

    let heroes = data.constants.map(|c| c.heroes).unwrap_or_default();
    Ok(build_roster(heroes))
}

/// Normalise raw constants rows into the roster.
///
/// Rows without a display name cannot be matched to records and are skipped.
pub fn build_roster(raw: Vec<ConstantsHero>) -> Roster {
    let mut heroes = BTreeMap::new();

    for entry in raw {
        let name = match entry.display_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                log::warn!("⚠️  Hero id {} has no display name, skipping", entry.id);
                continue;
            }
        };

        let raw_attr = entry
            .stats
            .and_then(|s| s.primary_attribute)
            .unwrap_or_else(|| "str".to_string());

        let mut roles: Vec<Role> = Vec::new();
        for role in entry.roles.unwrap_or_default() {
            let id = match &role.role_id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match Role::from_id(&id) {
                Some(role) if !roles.contains(&role) => roles.push(role),
                Some(_) => {}
                None => log::debug!("Dropping unknown role '{}' for {}", id, name),
            }
        }

        heroes.insert(
            entry.id,
            Hero {
                id: entry.id,
                name,
                primary_attribute: PrimaryAttribute::from_code(&raw_attr),
                roles,
                positions: BTreeMap::new(),
                matchups: HeroMatchups::default(),
            },
        );
    }

    Roster { heroes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_roster(body: &str) -> Vec<ConstantsHero> {
        let data: ConstantsData = serde_json::from_str(body).unwrap();
        data.constants.unwrap().heroes
    }

    #[test]
    fn test_build_roster_normalises_entries() {
        let raw = raw_roster(
            r#"{"constants": {"heroes": [
                {"id": 1, "displayName": "Anti-Mage", "stats": {"primaryAttribute": "agi"},
                 "roles": [{"roleId": "CARRY"}, {"roleId": "ESCAPE"}, {"roleId": "PUSHER"}]},
                {"id": 2, "displayName": "Axe", "stats": {"primaryAttribute": "str"},
                 "roles": [{"roleId": "INITIATOR"}, {"roleId": "DURABLE"}]},
                {"id": 3, "displayName": "Odd One", "stats": {"primaryAttribute": "foo"}}
            ]}}"#,
        );

        let roster = build_roster(raw);
        assert_eq!(roster.len(), 3);

        let am = &roster.heroes[&1];
        assert_eq!(am.name, "Anti-Mage");
        assert_eq!(am.primary_attribute, PrimaryAttribute::Agility);
        assert_eq!(am.roles, vec![Role::Carry, Role::Escaper]);

        let odd = &roster.heroes[&3];
        assert_eq!(odd.primary_attribute, PrimaryAttribute::Other("Foo".to_string()));
        assert!(odd.roles.is_empty());
    }

    #[test]
    fn test_missing_attribute_defaults_to_strength() {
        let raw = raw_roster(r#"{"constants": {"heroes": [{"id": 7, "displayName": "Earthshaker"}]}}"#);
        let roster = build_roster(raw);
        assert_eq!(roster.heroes[&7].primary_attribute, PrimaryAttribute::Strength);
    }

    #[test]
    fn test_nameless_hero_is_skipped() {
        let raw = raw_roster(r#"{"constants": {"heroes": [{"id": 9, "displayName": null}]}}"#);
        assert!(build_roster(raw).is_empty());
    }
}
