//! End-to-end passes against the in-memory channel.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde_json::{json, Value};

use rostersync_core::{types::RosterEntry, RosterLayout};
use rostersync_renderer::Renderer;
use rostersync_sync::{
    memory::{Mutation, Node},
    AgentAction, MemoryChannel, ModelUpdate, PassReport, Reconciler,
};

const BASE: &str = "/data/.openclaw";
const DOC: &str = "/data/.openclaw/openclaw.json";

fn seeded_channel() -> Arc<MemoryChannel> {
    Arc::new(
        MemoryChannel::new()
            .with_json(
                DOC,
                &json!({
                    "agents": {"defaults": {"model": "base"}, "list": []},
                    "tools": {"agentToAgent": {"enabled": true, "allow": []}},
                    "gateway": {"port": 18789}
                }),
            )
            .with_dir("/data/.openclaw/workspace/skills")
            .with_dir("/data/.openclaw/vault"),
    )
}

fn reconciler(channel: &Arc<MemoryChannel>) -> Reconciler {
    let layout = RosterLayout::new(BASE);
    let renderer = Renderer::new(layout.main_workspace()).expect("renderer");
    Reconciler::new(channel.clone(), layout, renderer)
}

fn pass(r: &Reconciler, roster: &[RosterEntry]) -> PassReport {
    r.run_pass(roster, &AtomicBool::new(false))
}

fn doc(channel: &MemoryChannel) -> Value {
    channel.json(DOC).expect("shared config")
}

// ---------------------------------------------------------------------------
// Scenario A: orchestrator on an empty target
// ---------------------------------------------------------------------------

#[test]
fn orchestrator_is_provisioned_at_base_workspace() {
    let ch = seeded_channel();
    let roster = vec![RosterEntry::new("Atlas", "CEO")];
    let report = pass(&reconciler(&ch), &roster);

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.created(), 1);
    assert!(ch.exists("/data/.openclaw/workspace/SOUL.md"));

    let doc = doc(&ch);
    assert_eq!(
        doc["agents"]["list"],
        json!([{"id": "main", "name": "Atlas", "workspace": "/data/.openclaw/workspace"}])
    );
    assert_eq!(doc["tools"]["agentToAgent"]["allow"], json!([]));
    assert_eq!(doc["agents"]["defaults"]["model"], "base");
    assert_eq!(doc["gateway"]["port"], 18789);
}

// ---------------------------------------------------------------------------
// Scenario B: model change on a known agent
// ---------------------------------------------------------------------------

#[test]
fn model_change_patches_only_the_model_field() {
    let ch = seeded_channel();
    let r = reconciler(&ch);

    pass(&r, &[RosterEntry::new("Forge", "builder").with_model("m1")]);
    let scaffold_before: Vec<Option<String>> = ["IDENTITY.md", "AGENTS.md", "TOOLS.md"]
        .iter()
        .map(|f| ch.file(&format!("/data/.openclaw/workspace-forge/{f}")))
        .collect();
    let doc_before = doc(&ch);
    ch.clear_mutations();

    let report = pass(&r, &[RosterEntry::new("Forge", "builder").with_model("m2")]);

    assert_eq!(report.updated(), 1);
    assert_eq!(
        report.agents[0].model,
        Some(ModelUpdate::Changed { from: Some("m1".into()), to: "m2".into() })
    );
    let scaffold_after: Vec<Option<String>> = ["IDENTITY.md", "AGENTS.md", "TOOLS.md"]
        .iter()
        .map(|f| ch.file(&format!("/data/.openclaw/workspace-forge/{f}")))
        .collect();
    assert_eq!(scaffold_before, scaffold_after);

    let mut expected = doc_before;
    expected["agents"]["list"][0]["model"] = json!("m2");
    assert_eq!(doc(&ch), expected);

    let writes: Vec<Mutation> = ch.mutations();
    assert_eq!(
        writes,
        vec![
            Mutation::Write(DOC.to_string()),
            Mutation::Write("/data/.openclaw/workspace-forge/SOUL.md".to_string()),
        ]
    );
}

#[test]
fn known_agent_without_model_leaves_shared_config_alone() {
    let ch = seeded_channel();
    let r = reconciler(&ch);
    pass(&r, &[RosterEntry::new("Forge", "builder").with_model("m1")]);
    ch.clear_mutations();

    let report = pass(&r, &[RosterEntry::new("Forge", "builder")]);
    assert_eq!(report.agents[0].model, None);
    assert!(!ch.mutations().iter().any(|m| m.touches(DOC)));
    assert_eq!(doc(&ch)["agents"]["list"][0]["model"], "m1");
}

// ---------------------------------------------------------------------------
// Scenario C: orchestrator soul lists the team
// ---------------------------------------------------------------------------

#[test]
fn orchestrator_soul_lists_forge_but_not_itself() {
    let ch = seeded_channel();
    let roster = vec![
        RosterEntry::new("Atlas", "CEO"),
        RosterEntry::new("Forge", "builder"),
    ];
    pass(&reconciler(&ch), &roster);

    let soul = ch.file("/data/.openclaw/workspace/SOUL.md").expect("soul");
    assert!(soul.contains("| **Forge** | `forge` | builder |"));
    assert!(!soul.contains("| **Atlas** |"));
    assert!(!soul.contains("`main`"));
}

// ---------------------------------------------------------------------------
// Scenario D: correct attachment is left alone
// ---------------------------------------------------------------------------

#[test]
fn correct_attachment_sees_zero_mutations() {
    let ch = seeded_channel();
    let r = reconciler(&ch);
    let roster = vec![RosterEntry::new("Forge", "builder")];
    pass(&r, &roster);
    ch.clear_mutations();

    pass(&r, &roster);
    let skills = "/data/.openclaw/workspace-forge/skills";
    let vault = "/data/.openclaw/workspace-forge/vault";
    assert!(!ch.mutations().iter().any(|m| m.touches(skills) || m.touches(vault)));
    assert_eq!(
        ch.node(skills),
        Some(Node::Link("/data/.openclaw/workspace/skills".to_string()))
    );
}

// ---------------------------------------------------------------------------
// Idempotence and isolation
// ---------------------------------------------------------------------------

#[test]
fn second_pass_only_rewrites_markers() {
    let ch = seeded_channel();
    let r = reconciler(&ch);
    let roster = vec![
        RosterEntry::new("Atlas", "CEO"),
        RosterEntry::new("Forge", "builder").with_model("m1"),
        RosterEntry::new("Deep Research", "research"),
    ];
    let first = pass(&r, &roster);
    assert_eq!(first.created(), 3);
    let doc_after_first = ch.file(DOC);
    ch.clear_mutations();

    let second = pass(&r, &roster);
    assert_eq!(second.updated(), 3);
    assert_eq!(ch.file(DOC), doc_after_first);
    let mut mutations = ch.mutations();
    mutations.sort_by_key(|m| format!("{m:?}"));
    assert_eq!(
        mutations,
        vec![
            Mutation::Write("/data/.openclaw/workspace-deepresearch/SOUL.md".to_string()),
            Mutation::Write("/data/.openclaw/workspace-forge/SOUL.md".to_string()),
            Mutation::Write("/data/.openclaw/workspace/SOUL.md".to_string()),
        ]
    );
}

#[test]
fn registration_is_duplicate_free_across_passes() {
    let ch = seeded_channel();
    let r = reconciler(&ch);
    let roster = vec![
        RosterEntry::new("Forge", "builder"),
        RosterEntry::new("Quill", "Ghostwriter"),
    ];
    pass(&r, &roster);
    // A lost marker forces re-provisioning; the registration must not repeat.
    ch.remove("/data/.openclaw/workspace-forge/SOUL.md");
    let report = pass(&r, &roster);

    assert_eq!(report.agents[0].action, AgentAction::Created);
    let doc = doc(&ch);
    assert_eq!(doc["agents"]["list"].as_array().unwrap().len(), 2);
    assert_eq!(doc["tools"]["agentToAgent"]["allow"], json!(["forge", "quill"]));
}

#[test]
fn failed_marker_write_is_retried_next_pass() {
    let ch = seeded_channel();
    let r = reconciler(&ch);
    let roster = vec![
        RosterEntry::new("Forge", "builder"),
        RosterEntry::new("Quill", "Ghostwriter"),
    ];
    ch.fail_writes_to("/data/.openclaw/workspace-forge/SOUL.md");
    let first = pass(&r, &roster);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].name, "Forge");
    assert!(first.failures[0].error.contains("SOUL.md"));
    assert!(ch.exists("/data/.openclaw/workspace-quill/SOUL.md"));

    ch.allow_writes_to("/data/.openclaw/workspace-forge/SOUL.md");
    let second = pass(&r, &roster);
    assert!(second.is_clean());
    assert!(ch.exists("/data/.openclaw/workspace-forge/SOUL.md"));
}
