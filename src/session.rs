//! The signing context object.
//!
//! One [`SigningSession`] per open form: it owns the per-role surfaces and
//! their stroke sessions plus the current document kind, and threads them
//! through the stateless core operations. The UI controller holds it and
//! drives it from input events.

use crate::error::{Error, Result};
use crate::preview::{self, PreviewDocument, SignatureAsset, SignatureSet};
use crate::stroke::{StrokeCapture, StrokeSession, StrokeStyle};
use crate::surface::{self, RasterSurface};
use crate::{DocumentKind, Point, SignerRole};
use chrono::NaiveDate;
use std::collections::HashMap;

struct Slot {
    surface: RasterSurface,
    stroke: StrokeSession,
}

/// Per-form signing state: document kind, mounted surfaces, live strokes.
pub struct SigningSession {
    kind: DocumentKind,
    capture: StrokeCapture,
    slots: HashMap<SignerRole, Slot>,
}

impl SigningSession {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            capture: StrokeCapture::new(StrokeStyle::default()),
            slots: HashMap::new(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Mount (or remount) a blank signing surface for a role.
    pub fn mount(&mut self, role: SignerRole, width: u32, height: u32, dpr: f32) {
        self.slots.insert(
            role,
            Slot {
                surface: RasterSurface::new(width, height, dpr),
                stroke: StrokeSession::default(),
            },
        );
    }

    /// Re-acquire a surface at a new size. Matches the host resizing a
    /// backing store: content does not survive, the stroke session does.
    pub fn resize(&mut self, role: SignerRole, width: u32, height: u32, dpr: f32) {
        if let Some(slot) = self.slots.get_mut(&role) {
            slot.surface = RasterSurface::new(width, height, dpr);
        } else {
            log::warn!("resize for unmounted {role:?} surface ignored");
        }
    }

    pub fn unmount(&mut self, role: SignerRole) {
        self.slots.remove(&role);
    }

    pub fn surface(&self, role: SignerRole) -> Result<&RasterSurface> {
        self.slots
            .get(&role)
            .map(|s| &s.surface)
            .ok_or(Error::MissingMountPoint(role))
    }

    /// Pointer-down for a role. A missing mount point is a view/state
    /// mismatch the user cannot act on: logged, then a no-op.
    pub fn begin(&mut self, role: SignerRole, point: Point) {
        match self.slots.get_mut(&role) {
            Some(slot) => self.capture.begin(&mut slot.stroke, point),
            None => log::warn!("begin on unmounted {role:?} surface ignored"),
        }
    }

    /// Pointer-move for a role; draws while that role's stroke is active.
    pub fn extend(&mut self, role: SignerRole, point: Point) {
        match self.slots.get_mut(&role) {
            Some(slot) => self
                .capture
                .extend(&mut slot.stroke, &mut slot.surface, point),
            None => log::warn!("extend on unmounted {role:?} surface ignored"),
        }
    }

    /// Pointer-up / leave / touch-end for a role. Idempotent.
    pub fn end(&mut self, role: SignerRole) {
        if let Some(slot) = self.slots.get_mut(&role) {
            self.capture.end(&mut slot.stroke);
        }
    }

    /// Erase a role's surface. Pixels only — an in-progress stroke session
    /// stays active.
    pub fn clear(&mut self, role: SignerRole) {
        match self.slots.get_mut(&role) {
            Some(slot) => slot.surface.clear(),
            None => log::warn!("clear on unmounted {role:?} surface ignored"),
        }
    }

    /// Commit ink drawn on an auxiliary (rotated/enlarged) surface onto the
    /// role's mounted form field, with axis scaling.
    pub fn commit_from(&mut self, role: SignerRole, auxiliary: &RasterSurface) {
        match self.slots.get_mut(&role) {
            Some(slot) => surface::transfer(auxiliary, &mut slot.surface),
            None => log::warn!("commit onto unmounted {role:?} surface ignored"),
        }
    }

    /// Signature-presence gate for one role.
    pub fn signed(&self, role: SignerRole) -> bool {
        self.slots
            .get(&role)
            .map(|s| !s.surface.is_blank())
            .unwrap_or(false)
    }

    /// Required signers whose surface is still blank (or unmounted).
    pub fn missing_signers(&self) -> Vec<SignerRole> {
        self.kind
            .required_signers()
            .iter()
            .copied()
            .filter(|r| !self.signed(*r))
            .collect()
    }

    /// Freeze a role's surface into an encoded signature asset.
    pub fn freeze(&self, role: SignerRole) -> Result<SignatureAsset> {
        SignatureAsset::from_surface(role, self.surface(role)?)
    }

    /// Gate on the required signers, freeze their surfaces, and build the
    /// finalized preview for this session's document kind. The previous
    /// preview (if any) is wholly superseded.
    pub fn build_preview(&self, today: NaiveDate) -> Result<PreviewDocument> {
        let missing = self.missing_signers();
        if !missing.is_empty() {
            return Err(Error::IncompleteSignatures { missing });
        }

        let mut signatures = SignatureSet::default();
        for role in self.kind.required_signers() {
            signatures.insert(self.freeze(*role)?);
        }
        // A counselor who signed anyway (optional in some variants) is
        // still embedded in preference to the decorative seal.
        if signatures.counselor.is_none() && self.signed(SignerRole::Counselor) {
            signatures.insert(self.freeze(SignerRole::Counselor)?);
        }

        preview::build(self.kind, &signatures, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point { x, y }
    }

    fn draw(session: &mut SigningSession, role: SignerRole, from: Point, to: Point) {
        session.begin(role, from);
        session.extend(role, to);
        session.end(role);
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    #[test]
    fn unmounted_draw_is_a_logged_noop() {
        let mut session = SigningSession::new(DocumentKind::Counseling);
        session.begin(SignerRole::Client, p(1.0, 1.0));
        session.extend(SignerRole::Client, p(5.0, 5.0));
        assert!(!session.signed(SignerRole::Client));
    }

    #[test]
    fn preview_gate_blocks_until_both_sign() {
        let mut session = SigningSession::new(DocumentKind::Counseling);
        session.mount(SignerRole::Client, 400, 150, 1.0);
        session.mount(SignerRole::Counselor, 400, 150, 1.0);

        draw(&mut session, SignerRole::Client, p(10.0, 10.0), p(50.0, 50.0));
        let err = session.build_preview(today()).unwrap_err();
        assert_eq!(err.missing_signers(), &[SignerRole::Counselor]);

        draw(
            &mut session,
            SignerRole::Counselor,
            p(5.0, 5.0),
            p(20.0, 20.0),
        );
        let doc = session.build_preview(today()).unwrap();
        assert_eq!(doc.slot_count(), 0);
        assert_eq!(doc.image_count(), 2);
    }

    #[test]
    fn recording_needs_only_the_client() {
        let mut session = SigningSession::new(DocumentKind::Recording);
        session.mount(SignerRole::Client, 400, 150, 1.0);
        session.mount(SignerRole::Counselor, 400, 150, 1.0);

        draw(&mut session, SignerRole::Client, p(10.0, 10.0), p(60.0, 40.0));
        assert!(session.missing_signers().is_empty());
        let doc = session.build_preview(today()).unwrap();
        // Inline substitution + client column + decorative seal column
        assert_eq!(doc.image_count(), 3);
    }

    #[test]
    fn optional_counselor_signature_beats_the_seal() {
        let mut session = SigningSession::new(DocumentKind::Recording);
        session.mount(SignerRole::Client, 400, 150, 1.0);
        session.mount(SignerRole::Counselor, 400, 150, 1.0);

        draw(&mut session, SignerRole::Client, p(10.0, 10.0), p(60.0, 40.0));
        draw(
            &mut session,
            SignerRole::Counselor,
            p(15.0, 15.0),
            p(70.0, 45.0),
        );
        let doc = session.build_preview(today()).unwrap();
        assert_eq!(doc.image_count(), 3);
    }

    #[test]
    fn resize_reacquires_a_blank_surface() {
        let mut session = SigningSession::new(DocumentKind::Counseling);
        session.mount(SignerRole::Client, 400, 150, 1.0);
        draw(&mut session, SignerRole::Client, p(10.0, 10.0), p(50.0, 50.0));
        assert!(session.signed(SignerRole::Client));

        session.resize(SignerRole::Client, 300, 120, 2.0);
        assert!(!session.signed(SignerRole::Client));
        assert_eq!(session.surface(SignerRole::Client).unwrap().width(), 600);
    }

    #[test]
    fn clear_resets_the_presence_gate() {
        let mut session = SigningSession::new(DocumentKind::Counseling);
        session.mount(SignerRole::Client, 400, 150, 1.0);
        draw(&mut session, SignerRole::Client, p(10.0, 10.0), p(50.0, 50.0));
        session.clear(SignerRole::Client);
        assert!(!session.signed(SignerRole::Client));
    }

    #[test]
    fn commit_from_auxiliary_surface() {
        let mut session = SigningSession::new(DocumentKind::Counseling);
        session.mount(SignerRole::Client, 200, 75, 1.0);

        // Landscape-mode auxiliary surface, twice the size
        let mut aux = RasterSurface::new(400, 150, 1.0);
        let capture = StrokeCapture::default();
        let mut stroke = StrokeSession::default();
        capture.begin(&mut stroke, p(20.0, 20.0));
        capture.extend(&mut stroke, &mut aux, p(80.0, 60.0));

        session.commit_from(SignerRole::Client, &aux);
        assert!(session.signed(SignerRole::Client));
    }
}
