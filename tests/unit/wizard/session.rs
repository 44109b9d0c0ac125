use super::*;
use crate::{
    catalog::{model::Slot, store::StaticCatalog},
    media::probe::FixedProbe,
    render::InMemoryRenderer,
};

fn catalog() -> SharedCatalog {
    let slot = |id: &str, target: f64| Slot {
        id: id.to_string(),
        label: id.to_uppercase(),
        target_duration_sec: target,
    };
    Arc::new(
        StaticCatalog::new(
            vec![
                Niche {
                    id: "fitness".to_string(),
                    label: "Fitness".to_string(),
                    description: String::new(),
                },
                Niche {
                    id: "food".to_string(),
                    label: "Food".to_string(),
                    description: String::new(),
                },
            ],
            vec![
                Template {
                    id: "duo".to_string(),
                    name: "Duo".to_string(),
                    niche: "fitness".to_string(),
                    slots: vec![slot("a", 10.0), slot("b", 5.0)],
                    bgm: "pulse.mp3".to_string(),
                    description: String::new(),
                },
                Template {
                    id: "trio".to_string(),
                    name: "Trio".to_string(),
                    niche: "fitness".to_string(),
                    slots: vec![slot("x", 3.0), slot("y", 3.0), slot("z", 3.0)],
                    bgm: "beat.mp3".to_string(),
                    description: String::new(),
                },
                Template {
                    id: "dish".to_string(),
                    name: "Dish".to_string(),
                    niche: "food".to_string(),
                    slots: vec![slot("plate", 4.0)],
                    bgm: "jazz.mp3".to_string(),
                    description: String::new(),
                },
            ],
        )
        .unwrap(),
    )
}

fn probe() -> FixedProbe {
    FixedProbe::new()
        .with("eight", 8.0)
        .with("twelve", 12.0)
        .with("two", 2.0)
}

fn blob(src: &str) -> MediaBlob {
    MediaBlob::new(format!("{src}.mp4"), 1_000, src)
}

fn at_upload(config: WizardConfig, template: &str) -> WizardSession {
    let mut s = WizardSession::new(catalog(), config).unwrap();
    s.select_niche("fitness").unwrap();
    s.select_template(template).unwrap();
    s
}

#[test]
fn linear_forward_path_is_gated() {
    let mut s = WizardSession::new(catalog(), WizardConfig::default()).unwrap();
    assert_eq!(s.stage(), Stage::NicheSelect);
    assert!(matches!(s.advance(), Err(SlotreelError::Stage(_))));

    s.select_niche("fitness").unwrap();
    assert_eq!(s.stage(), Stage::TemplateSelect);
    assert_eq!(s.templates().len(), 2);
    assert!(s.advance().is_err());

    s.select_template("duo").unwrap();
    assert_eq!(s.stage(), Stage::Upload);
    assert!(!s.readiness().can_advance);
    assert!(s.advance().is_err());

    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    assert!(report.readiness.slots_filled);
    assert!(!report.readiness.all_ready);
    s.advance().unwrap();
    assert_eq!(s.stage(), Stage::Trim);
    assert!(s.advance().is_err());

    let r = s.upsert_trim(&report.added[1], 0.0, 5.0).unwrap();
    assert!(r.all_ready && r.can_advance);
    s.advance().unwrap();
    assert_eq!(s.stage(), Stage::Render);
    assert!(s.advance().is_err());
}

#[test]
fn go_to_cannot_skip_forward() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    assert!(s.go_to(Stage::Render).is_err());
    s.go_to(Stage::NicheSelect).unwrap();
    assert_eq!(s.stage(), Stage::NicheSelect);
    s.go_to(Stage::TemplateSelect).unwrap();
    assert_eq!(s.stage(), Stage::TemplateSelect);
}

#[test]
fn back_is_unconditional_and_keeps_state() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    s.add_clips(vec![blob("eight")], &probe()).unwrap();
    assert_eq!(s.back().stage, Stage::TemplateSelect);
    assert_eq!(s.back().stage, Stage::NicheSelect);
    assert_eq!(s.back().stage, Stage::NicheSelect);
    assert_eq!(s.clips().len(), 1);
}

#[test]
fn changing_template_or_niche_resets_downstream() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    s.upsert_trim(&report.added[1], 1.0, 6.0).unwrap();

    // Same template again keeps everything.
    s.select_template("duo").unwrap();
    assert_eq!(s.clips().len(), 2);
    assert_eq!(s.ledger().len(), 1);

    s.select_template("trio").unwrap();
    assert!(s.clips().is_empty());
    assert!(s.ledger().is_empty());
    assert_eq!(s.previews().live(), 0);

    s.add_clips(vec![blob("two")], &probe()).unwrap();
    s.select_niche("food").unwrap();
    assert!(s.template().is_none());
    assert!(s.clips().is_empty());
    assert_eq!(s.stage(), Stage::TemplateSelect);
}

#[test]
fn template_must_match_selected_niche() {
    let mut s = WizardSession::new(catalog(), WizardConfig::default()).unwrap();
    assert!(matches!(
        s.select_template("duo"),
        Err(SlotreelError::Stage(_))
    ));
    s.select_niche("food").unwrap();
    assert!(s.select_template("duo").is_err());
    assert!(s.select_template("nope").is_err());
    assert!(s.select_niche("nope").is_err());
}

#[test]
fn remove_cascades_to_trim() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    let long = &report.added[1];
    s.upsert_trim(long, 0.0, 5.0).unwrap();
    assert!(s.ledger().has(long));

    let r = s.remove_clip(long).unwrap();
    assert!(!s.ledger().has(long));
    assert!(!r.slots_filled);

    // A late trim for the removed clip is dropped silently.
    s.upsert_trim(long, 0.0, 5.0).unwrap();
    assert!(s.ledger().is_empty());
}

#[test]
fn trim_bounds_are_checked() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    let long = &report.added[1];

    assert!(s.upsert_trim(long, 5.0, 4.0).is_err());
    assert!(s.upsert_trim(long, -1.0, 4.0).is_err());
    assert!(s.upsert_trim(long, 8.0, 12.5).is_err());
    assert!(s.upsert_trim(long, 3.0, 3.2).is_err());
    assert!(s.trim_from(long, 1.0).is_err());
    assert!(s.ledger().is_empty());

    s.upsert_trim(long, 7.0, 12.0).unwrap();
    assert_eq!(s.ledger().get(long).unwrap().start_sec, 7.0);
}

#[test]
fn single_ended_mode_derives_out_point() {
    let config = WizardConfig {
        trim_mode: TrimMode::SingleEnded,
        ..WizardConfig::default()
    };
    let mut s = at_upload(config, "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    let long = &report.added[1];

    assert!(s.upsert_trim(long, 0.0, 5.0).is_err());
    s.trim_from(long, 3.0).unwrap();
    let t = s.ledger().get(long).unwrap();
    assert_eq!((t.start_sec, t.end_sec), (3.0, 8.0));

    s.trim_from(long, 10.0).unwrap();
    let t = s.ledger().get(long).unwrap();
    assert_eq!((t.start_sec, t.end_sec), (10.0, 12.0));

    assert!(s.trim_from(long, 11.8).is_err());
}

#[test]
fn default_trim_seeds_only_when_needed() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();

    assert_eq!(s.ensure_default_trim(&report.added[0]).unwrap(), None);
    let seeded = s.ensure_default_trim(&report.added[1]).unwrap().unwrap();
    assert_eq!((seeded.start_sec, seeded.end_sec), (0.0, 5.0));

    s.upsert_trim(&report.added[1], 2.0, 7.0).unwrap();
    let kept = s.ensure_default_trim(&report.added[1]).unwrap().unwrap();
    assert_eq!(kept.start_sec, 2.0);
    assert_eq!(
        s.suggested_trim(&report.added[1]),
        Some(TimeRange {
            start_sec: 0.0,
            end_sec: 5.0
        })
    );
}

#[test]
fn enforce_trim_fit_blocks_loose_trims() {
    let config = WizardConfig {
        enforce_trim_fit: true,
        ..WizardConfig::default()
    };
    let mut s = at_upload(config, "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    s.advance().unwrap();

    s.upsert_trim(&report.added[1], 2.0, 9.0).unwrap();
    assert!(s.all_ready());
    assert!(s.advance().is_err());

    s.upsert_trim(&report.added[1], 2.0, 7.0).unwrap();
    s.advance().unwrap();
    assert_eq!(s.stage(), Stage::Render);
}

#[test]
fn render_stage_freezes_edits_and_records_outcome() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    let mut renderer = InMemoryRenderer::new();
    assert!(s.render(&mut renderer).is_err());

    s.advance().unwrap();
    s.upsert_trim(&report.added[1], 2.0, 7.0).unwrap();
    s.advance().unwrap();

    assert!(matches!(
        s.remove_clip(&report.added[0]),
        Err(SlotreelError::Stage(_))
    ));
    assert!(s.upsert_trim(&report.added[1], 0.0, 5.0).is_err());

    let artifact = s.render(&mut renderer).unwrap();
    assert_eq!(s.render_state(), &RenderState::Done(artifact));
    let req = &renderer.requests()[0];
    assert_eq!(req.bgm, "pulse.mp3");
    assert_eq!(req.segments[0].end_sec, 8.0);
    assert_eq!(req.segments[1].start_sec, 2.0);

    s.back();
    assert_eq!(s.render_state(), &RenderState::Idle);
    s.advance().unwrap();

    let mut failing = InMemoryRenderer::failing("disk full");
    assert!(s.render(&mut failing).is_err());
    assert!(matches!(s.render_state(), RenderState::Failed(m) if m.contains("disk full")));
}

#[test]
fn stale_batch_is_dropped_after_template_change() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let pending = s.begin_batch(vec![blob("eight")]).unwrap();
    s.select_template("trio").unwrap();
    let report = s
        .commit_batch(pending, vec![ClipDuration::Known(8.0)])
        .unwrap();
    assert!(report.added.is_empty());
    assert!(s.clips().is_empty());
}

#[test]
fn reprobe_upgrades_unknown_duration() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let report = s
        .add_clips(vec![blob("eight"), blob("late")], &probe())
        .unwrap();
    let late = &report.added[1];
    assert_eq!(s.registry().clip(late).unwrap().duration(), ClipDuration::Unknown);
    assert!(!s.all_ready());

    let fixed = probe().with("late", 4.0);
    let r = s.reprobe(late, &fixed).unwrap();
    assert!(r.all_ready);

    let ticket = s.begin_reprobe(late).unwrap();
    s.remove_clip(late).unwrap();
    let (applied, _) = s.apply_probe(ticket, Ok(1.0));
    assert_eq!(applied, ProbeApplied::Stale);
}

#[test]
fn snapshot_and_restore_clamp_stage() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let report = s.add_clips(vec![blob("eight"), blob("twelve")], &probe()).unwrap();
    s.advance().unwrap();
    s.upsert_trim(&report.added[1], 0.0, 5.0).unwrap();

    let snap = s.snapshot();
    assert_eq!(snap.current_step, Stage::Trim);
    assert_eq!(snap.trim_ranges.len(), 1);
    assert_eq!(snap.selected_template.as_ref().unwrap().id, "duo");

    let restored = WizardSession::restore(catalog(), WizardConfig::default(), snap).unwrap();
    assert_eq!(restored.stage(), Stage::Upload);
    assert_eq!(restored.selected_niche(), Some("fitness"));
    assert_eq!(restored.template().unwrap().id, "duo");
    assert!(restored.clips().is_empty());
    assert!(restored.ledger().is_empty());
}

#[test]
fn reset_returns_to_initial_state() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    s.add_clips(vec![blob("eight")], &probe()).unwrap();
    let r = s.reset();
    assert_eq!(r.stage, Stage::NicheSelect);
    assert!(s.selected_niche().is_none());
    assert!(s.template().is_none());
    assert_eq!(s.previews().live(), 0);
    assert_eq!(s.snapshot(), Snapshot::default());
}

#[test]
fn new_duration_clamps_trim_past_the_end() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let late = s
        .add_clips(vec![blob("eight"), blob("late")], &probe())
        .unwrap()
        .added[1]
        .clone();
    s.advance().unwrap();
    s.upsert_trim(&late, 0.0, 20.0).unwrap();

    s.reprobe(&late, &probe().with("late", 4.0)).unwrap();
    let trim = s.ledger().get(&late).unwrap();
    assert_eq!((trim.start_sec, trim.end_sec), (0.0, 4.0));

    s.advance().unwrap();
    let mut renderer = InMemoryRenderer::new();
    s.render(&mut renderer).unwrap();
    let seg = &renderer.requests()[0].segments[1];
    assert_eq!(seg.clip_id, late);
    assert!(seg.end_sec <= 4.0);
}

#[test]
fn late_duration_drops_trim_left_too_short() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let late = s
        .add_clips(vec![blob("eight"), blob("late")], &probe())
        .unwrap()
        .added[1]
        .clone();
    s.upsert_trim(&late, 2.0, 9.0).unwrap();

    let ticket = s.begin_reprobe(&late).unwrap();
    let (applied, readiness) = s.apply_probe(ticket, Ok(2.3));
    assert_eq!(applied, ProbeApplied::Updated(ClipDuration::Known(2.3)));
    assert!(!s.ledger().has(&late));
    assert!(readiness.all_ready);
}

#[test]
fn zero_second_clip_needs_a_trim() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let zero = s
        .add_clips(vec![blob("eight"), blob("zero")], &probe().with("zero", 0.0))
        .unwrap()
        .added[1]
        .clone();
    assert_eq!(s.registry().clip(&zero).unwrap().duration(), ClipDuration::Unknown);
    assert!(!s.all_ready());
    assert!(s.edit_plan().unwrap().entries[1].clip.as_ref().unwrap().effective_range.is_none());

    s.upsert_trim(&zero, 0.0, 5.0).unwrap();
    assert!(s.all_ready());
}

#[test]
fn min_trim_sec_zero_accepts_short_spans() {
    let mut s = at_upload(WizardConfig::default(), "duo");
    let long = s
        .add_clips(vec![blob("eight"), blob("twelve")], &probe())
        .unwrap()
        .added[1]
        .clone();
    assert!(s.upsert_trim(&long, 0.0, 0.3).is_err());

    let config = WizardConfig {
        min_trim_sec: 0.0,
        ..WizardConfig::default()
    };
    let mut s = at_upload(config, "duo");
    let long = s
        .add_clips(vec![blob("eight"), blob("twelve")], &probe())
        .unwrap()
        .added[1]
        .clone();
    s.upsert_trim(&long, 0.0, 0.3).unwrap();
    assert_eq!(s.ledger().get(&long).unwrap().end_sec, 0.3);
}

#[test]
fn restore_discards_selections_missing_from_catalog() {
    let mut gone = catalog().template("duo").unwrap();
    gone.id = "gone".to_string();
    let snap = Snapshot {
        current_step: Stage::Trim,
        selected_niche_id: Some("fitness".to_string()),
        selected_template: Some(gone),
        trim_ranges: Vec::new(),
    };
    let s = WizardSession::restore(catalog(), WizardConfig::default(), snap).unwrap();
    assert_eq!(s.stage(), Stage::TemplateSelect);
    assert_eq!(s.selected_niche(), Some("fitness"));
    assert!(s.template().is_none());

    let snap = Snapshot {
        current_step: Stage::Upload,
        selected_niche_id: Some("food".to_string()),
        selected_template: catalog().template("duo"),
        trim_ranges: Vec::new(),
    };
    let s = WizardSession::restore(catalog(), WizardConfig::default(), snap).unwrap();
    assert_eq!(s.stage(), Stage::TemplateSelect);
    assert_eq!(s.selected_niche(), Some("food"));
    assert!(s.template().is_none());

    let snap = Snapshot {
        current_step: Stage::TemplateSelect,
        selected_niche_id: Some("travel".to_string()),
        selected_template: None,
        trim_ranges: Vec::new(),
    };
    let s = WizardSession::restore(catalog(), WizardConfig::default(), snap).unwrap();
    assert_eq!(s.stage(), Stage::NicheSelect);
    assert!(s.selected_niche().is_none());
}

#[test]
fn restore_picks_up_the_catalog_version_of_the_template() {
    let mut stale = catalog().template("trio").unwrap();
    stale.slots.pop();
    let snap = Snapshot {
        current_step: Stage::Upload,
        selected_niche_id: None,
        selected_template: Some(stale),
        trim_ranges: Vec::new(),
    };
    let s = WizardSession::restore(catalog(), WizardConfig::default(), snap).unwrap();
    assert_eq!(s.stage(), Stage::Upload);
    assert_eq!(s.selected_niche(), Some("fitness"));
    assert_eq!(s.template().unwrap().slots.len(), 3);
}
