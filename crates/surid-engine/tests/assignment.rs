//! End-to-end assignment scenarios over the real surface table.

use chrono::{DateTime, Utc};

use surid_core::{DefaultRange, Rule, RuleStore, SurfaceHandle};
use surid_engine::{AssignError, AssignOutcome, IdAgent};
use surid_host::{SurfaceHost, SurfaceTable};
use surid_registry::SurfaceRegistry;

/// Registry double recording the mirrored state the way an external store
/// would see it.
#[derive(Default)]
struct MirrorRegistry {
    entries: Vec<(String, u32)>,
}

impl SurfaceRegistry for MirrorRegistry {
    fn register(&mut self, app_id: Option<&str>, surface_id: u32) {
        if let Some(app_id) = app_id.filter(|id| !id.is_empty()) {
            if surface_id > 0 {
                self.entries.push((app_id.to_string(), surface_id));
            }
        }
    }

    fn unregister(&mut self, surface_id: u32) {
        self.entries.retain(|(_, id)| *id != surface_id);
    }
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-08-01T09:00:00Z")
        .expect("valid")
        .with_timezone(&Utc)
}

fn rule(surface_id: u32, app_id: Option<&str>, title: Option<&str>) -> Rule {
    Rule {
        surface_id,
        app_id: app_id.map(str::to_string),
        title: title.map(str::to_string),
    }
}

fn configure(
    table: &mut SurfaceTable,
    agent: &mut IdAgent<MirrorRegistry>,
    raw: &str,
    app_id: Option<&str>,
    title: Option<&str>,
) -> Result<AssignOutcome, AssignError> {
    let surface = SurfaceHandle::new(raw);
    table.upsert(
        surface.clone(),
        app_id.map(str::to_string),
        title.map(str::to_string),
        now(),
    );
    agent.surface_configured(table, &surface)
}

fn remove(table: &mut SurfaceTable, agent: &mut IdAgent<MirrorRegistry>, raw: &str) {
    let surface = SurfaceHandle::new(raw);
    // Unregistration reads the id the surface held at removal time, so the
    // table entry goes away only after the agent has seen the event.
    agent.surface_removed(table, &surface);
    table.remove(&surface);
}

#[test]
fn rule_assignment_mirrors_into_registry() {
    let rules = RuleStore::load(vec![rule(7, Some("nav"), None)], None).expect("valid");
    let mut agent = IdAgent::new(rules, None, MirrorRegistry::default());
    let mut table = SurfaceTable::new();

    let outcome =
        configure(&mut table, &mut agent, "s-1", Some("nav"), None).expect("assignment");
    assert_eq!(outcome, AssignOutcome::Rule { surface_id: 7 });
    assert_eq!(
        table.surface_id(&SurfaceHandle::new("s-1")),
        Some(7),
        "id applied at the host"
    );
    assert_eq!(agent.registry_mut().entries, vec![("nav".to_string(), 7)]);
}

#[test]
fn second_nav_surface_collides_and_gets_nothing() {
    let range = DefaultRange::new(100, 200).expect("valid");
    let rules =
        RuleStore::load(vec![rule(7, Some("nav"), None)], Some(&range)).expect("valid");
    let mut agent = IdAgent::new(rules, Some(range), MirrorRegistry::default());
    let mut table = SurfaceTable::new();

    configure(&mut table, &mut agent, "s-1", Some("nav"), None).expect("first assignment");
    let err = configure(&mut table, &mut agent, "s-2", Some("nav"), None)
        .expect_err("second nav surface collides");
    assert_eq!(
        err,
        AssignError::RuleOccupied {
            id: 7,
            holder: SurfaceHandle::new("s-1")
        }
    );
    // No default-range fallback happened.
    assert_eq!(table.surface_id(&SurfaceHandle::new("s-2")), None);
    assert_eq!(agent.registry_mut().entries.len(), 1);
}

#[test]
fn default_range_exhaustion_after_two_surfaces() {
    let range = DefaultRange::new(10, 12).expect("valid");
    let rules = RuleStore::load(Vec::new(), Some(&range)).expect("valid");
    let mut agent = IdAgent::new(rules, Some(range), MirrorRegistry::default());
    let mut table = SurfaceTable::new();

    assert_eq!(
        configure(&mut table, &mut agent, "s-1", Some("one"), None).expect("first"),
        AssignOutcome::DefaultRange { surface_id: 10 }
    );
    assert_eq!(
        configure(&mut table, &mut agent, "s-2", Some("two"), None).expect("second"),
        AssignOutcome::DefaultRange { surface_id: 11 }
    );
    assert_eq!(
        configure(&mut table, &mut agent, "s-3", Some("three"), None),
        Err(AssignError::RangeExhausted)
    );
    assert_eq!(
        agent.registry_mut().entries,
        vec![("one".to_string(), 10), ("two".to_string(), 11)]
    );
}

#[test]
fn removal_unregisters_and_frees_the_rule() {
    let rules = RuleStore::load(vec![rule(7, Some("nav"), None)], None).expect("valid");
    let mut agent = IdAgent::new(rules, None, MirrorRegistry::default());
    let mut table = SurfaceTable::new();

    configure(&mut table, &mut agent, "s-1", Some("nav"), None).expect("assignment");
    remove(&mut table, &mut agent, "s-1");
    assert!(agent.registry_mut().entries.is_empty());

    // A replacement surface with the same identity claims the rule again.
    let outcome =
        configure(&mut table, &mut agent, "s-2", Some("nav"), None).expect("re-assignment");
    assert_eq!(outcome, AssignOutcome::Rule { surface_id: 7 });
    assert_eq!(agent.registry_mut().entries, vec![("nav".to_string(), 7)]);
}

#[test]
fn mixed_rules_and_default_range() {
    let range = DefaultRange::new(100, 102).expect("valid");
    let rules = RuleStore::load(
        vec![
            rule(7, Some("nav"), None),
            rule(8, None, Some("Radio Player")),
        ],
        Some(&range),
    )
    .expect("valid");
    let mut agent = IdAgent::new(rules, Some(range), MirrorRegistry::default());
    let mut table = SurfaceTable::new();

    assert_eq!(
        configure(&mut table, &mut agent, "s-1", Some("nav"), Some("Map")).expect("rule hit"),
        AssignOutcome::Rule { surface_id: 7 }
    );
    assert_eq!(
        configure(&mut table, &mut agent, "s-2", Some("media"), Some("Radio Player"))
            .expect("title rule hit"),
        AssignOutcome::Rule { surface_id: 8 }
    );
    assert_eq!(
        configure(&mut table, &mut agent, "s-3", Some("settings"), None).expect("default"),
        AssignOutcome::DefaultRange { surface_id: 100 }
    );

    // Identity with no app id: the title stands in as the registry key.
    assert_eq!(
        configure(&mut table, &mut agent, "s-4", None, Some("Browser")).expect("default"),
        AssignOutcome::DefaultRange { surface_id: 101 }
    );
    assert_eq!(
        agent.registry_mut().entries,
        vec![
            ("nav".to_string(), 7),
            ("media".to_string(), 8),
            ("settings".to_string(), 100),
            ("Browser".to_string(), 101),
        ]
    );
}

#[test]
fn duplicate_configure_notification_is_ignored() {
    let rules = RuleStore::load(vec![rule(7, Some("nav"), None)], None).expect("valid");
    let mut agent = IdAgent::new(rules, None, MirrorRegistry::default());
    let mut table = SurfaceTable::new();

    configure(&mut table, &mut agent, "s-1", Some("nav"), None).expect("assignment");
    let outcome = configure(&mut table, &mut agent, "s-1", Some("nav"), None)
        .expect("duplicate notification");
    assert_eq!(outcome, AssignOutcome::AlreadyAssigned { surface_id: 7 });
    assert_eq!(agent.registry_mut().entries.len(), 1);
}
