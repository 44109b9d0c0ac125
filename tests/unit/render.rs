use super::*;
use crate::{
    foundation::core::{ClipDuration, TimeRange},
    plan::{PlanClip, PlanEntry, TrimValidity},
};

fn entry(idx: usize, target: f64, range: Option<TimeRange>, with_clip: bool) -> PlanEntry {
    PlanEntry {
        slot_index: idx,
        slot_id: format!("s{idx}"),
        slot_label: format!("S{idx}"),
        target_duration_sec: target,
        clip: with_clip.then(|| PlanClip {
            clip_id: ClipId(format!("clip-{idx}")),
            source: format!("/media/{idx}.mp4"),
            preview_uri: format!("preview://{idx}"),
            duration: ClipDuration::Known(12.0),
            needs_trim: true,
            effective_range: range,
            validity: range.map(|r| TrimValidity {
                ok: r.len_sec() <= target,
                overage_sec: (r.len_sec() - target).max(0.0),
            }),
        }),
    }
}

fn plan(entries: Vec<PlanEntry>) -> EditPlan {
    EditPlan {
        template_id: "t".to_string(),
        template_name: "T".to_string(),
        bgm: "bgm.mp3".to_string(),
        entries,
    }
}

#[test]
fn request_carries_ranges_and_overage() {
    let p = plan(vec![
        entry(0, 5.0, Some(TimeRange::new(2.0, 9.0).unwrap()), true),
        entry(1, 5.0, Some(TimeRange::new(0.0, 4.0).unwrap()), true),
    ]);
    let req = RenderRequest::from_plan(&p).unwrap();
    assert_eq!(req.segments.len(), 2);
    assert_eq!(req.segments[0].overage_sec, 2.0);
    assert_eq!(req.segments[1].overage_sec, 0.0);
    assert_eq!(req.total_duration_sec(), 11.0);
}

#[test]
fn request_rejects_empty_slot_or_missing_trim() {
    let empty = plan(vec![entry(0, 5.0, None, false)]);
    assert!(
        RenderRequest::from_plan(&empty)
            .unwrap_err()
            .to_string()
            .contains("has no clip")
    );
    let untrimmed = plan(vec![entry(0, 5.0, None, true)]);
    assert!(
        RenderRequest::from_plan(&untrimmed)
            .unwrap_err()
            .to_string()
            .contains("needs a trim")
    );
}

#[test]
fn manifest_renderer_writes_json() {
    let dir = std::env::temp_dir().join(format!("slotreel_manifest_{}", std::process::id()));
    let out = dir.join("nested").join("plan.json");
    let req = RenderRequest::from_plan(&plan(vec![entry(
        0,
        5.0,
        Some(TimeRange::new(0.0, 5.0).unwrap()),
        true,
    )]))
    .unwrap();

    let artifact = ManifestRenderer::new(&out).render(&req).unwrap();
    assert_eq!(artifact.uri, out.display().to_string());
    let back: RenderRequest =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(back, req);

    let err = ManifestRenderer::new(&out)
        .overwrite(false)
        .render(&req)
        .unwrap_err();
    assert!(err.to_string().contains("overwrite is disabled"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn in_memory_renderer_records_or_fails() {
    let req = RenderRequest::from_plan(&plan(vec![])).unwrap();
    let mut ok = InMemoryRenderer::new();
    assert_eq!(ok.render(&req).unwrap().uri, "memory://t/1");
    assert_eq!(ok.requests().len(), 1);

    let mut bad = InMemoryRenderer::failing("encoder offline");
    assert!(bad.render(&req).unwrap_err().to_string().contains("encoder offline"));
}
