//! End-to-end flows: sign, gate, preview, export.

use inkform::host::MemorySink;
use inkform::{
    BlockRasterizer, DocumentExporter, DocumentKind, Error, Point, SignerRole, SigningSession,
};
use std::sync::Arc;

fn p(x: f32, y: f32) -> Point {
    Point { x, y }
}

fn stroke(session: &mut SigningSession, role: SignerRole, from: Point, to: Point) {
    session.begin(role, from);
    session.extend(role, to);
    session.end(role);
}

#[tokio::test]
async fn counseling_flow_sign_preview_export() {
    let mut session = SigningSession::new(DocumentKind::Counseling);
    session.mount(SignerRole::Client, 400, 150, 1.0);
    session.mount(SignerRole::Counselor, 400, 150, 1.0);

    stroke(&mut session, SignerRole::Client, p(10.0, 10.0), p(50.0, 50.0));
    stroke(&mut session, SignerRole::Counselor, p(5.0, 5.0), p(20.0, 20.0));

    assert!(session.signed(SignerRole::Client));
    assert!(session.signed(SignerRole::Counselor));

    let today = chrono::Local::now().date_naive();
    let preview = session.build_preview(today).expect("both parties signed");
    assert_eq!(preview.slot_count(), 0);
    assert_eq!(preview.image_count(), 2);
    assert_eq!(
        preview.date_stamp(),
        format!("日期：{}", today.format("%Y-%m-%d"))
    );

    let sink = Arc::new(MemorySink::new());
    let exporter = DocumentExporter::new(Arc::new(BlockRasterizer), sink.clone());
    let artifact = exporter
        .export_image(&preview)
        .await
        .expect("export succeeds")
        .expect("no export was in flight");

    assert_eq!(
        artifact.filename,
        format!("心理咨询_{}.png", today.format("%Y-%m-%d"))
    );
    assert_eq!(&artifact.bytes[0..8], b"\x89PNG\r\n\x1a\n");
    // 2x capture of the 900px printable container
    assert_eq!(artifact.width, 1800);

    let saved = sink.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, artifact.filename);
    assert!(!exporter.is_exporting());
}

#[tokio::test]
async fn recording_flow_uses_seal_and_pdf_filename() {
    let mut session = SigningSession::new(DocumentKind::Recording);
    session.mount(SignerRole::Client, 400, 150, 1.0);
    session.mount(SignerRole::Counselor, 400, 150, 1.0);

    stroke(&mut session, SignerRole::Client, p(12.0, 20.0), p(90.0, 70.0));

    let today = chrono::Local::now().date_naive();
    let preview = session.build_preview(today).expect("client signed");
    // Inline substitution + client column + decorative counselor seal
    assert_eq!(preview.slot_count(), 0);
    assert_eq!(preview.image_count(), 3);

    let sink = Arc::new(MemorySink::new());
    let exporter = DocumentExporter::new(Arc::new(BlockRasterizer), sink.clone());
    let artifact = exporter
        .export_pdf(&preview)
        .await
        .expect("export succeeds")
        .expect("no export was in flight");

    assert_eq!(
        artifact.filename,
        format!("录音录像_{}.pdf", today.format("%Y-%m-%d"))
    );
    assert!(artifact.bytes.starts_with(b"%PDF-"));
    assert_eq!(sink.saved().len(), 1);
}

#[tokio::test]
async fn preview_gate_blocks_with_actionable_message() {
    let mut session = SigningSession::new(DocumentKind::Counseling);
    session.mount(SignerRole::Client, 400, 150, 1.0);
    session.mount(SignerRole::Counselor, 400, 150, 1.0);

    stroke(&mut session, SignerRole::Client, p(10.0, 10.0), p(50.0, 50.0));

    let err = session
        .build_preview(chrono::Local::now().date_naive())
        .unwrap_err();
    assert!(matches!(err, Error::IncompleteSignatures { .. }));
    assert_eq!(err.to_string(), "请完成双方签名后再预览");
    assert_eq!(err.missing_signers(), &[SignerRole::Counselor]);
}

#[test]
fn clearing_reopens_the_gate() {
    let mut session = SigningSession::new(DocumentKind::Counseling);
    session.mount(SignerRole::Client, 400, 150, 1.0);
    session.mount(SignerRole::Counselor, 400, 150, 1.0);

    stroke(&mut session, SignerRole::Client, p(10.0, 10.0), p(50.0, 50.0));
    stroke(&mut session, SignerRole::Counselor, p(5.0, 5.0), p(20.0, 20.0));
    assert!(session.missing_signers().is_empty());

    session.clear(SignerRole::Counselor);
    assert_eq!(session.missing_signers(), &[SignerRole::Counselor]);
}
