//! Pipeline phases and their ordering.
//!
//! A [`Phase`] is an identity token naming one stage of a pipeline's fixed
//! execution order. [`Phases`] holds the ordered set: phases are appended or
//! inserted relative to an existing phase, the resulting order is total, and
//! ties (several phases inserted after the same anchor) keep insertion
//! order.

use sluice_core::{Error, Result};

/// A named stage in a pipeline's fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Phase(&'static str);

impl Phase {
    /// Creates a phase token.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Phase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Phases of the request pipeline, in execution order.
pub mod request {
    use super::Phase;

    /// First chance to observe the outgoing request.
    pub const BEFORE: Phase = Phase::new("Before");
    /// Per-call state population.
    pub const STATE: Phase = Phase::new("State");
    /// Body rendering and request finalization.
    pub const RENDER: Phase = Phase::new("Render");
    /// Last stop before the engine; interceptors here may supply a
    /// synthetic response instead of dispatching.
    pub const SEND: Phase = Phase::new("Send");
}

/// Phases of the response pipeline, in execution order.
pub mod response {
    use super::Phase;

    /// Raw response just received from the engine.
    pub const RECEIVE: Phase = Phase::new("Receive");
    /// Expected-success policy and validators run here.
    pub const VALIDATE: Phase = Phase::new("Validate");
    /// Response transformation.
    pub const TRANSFORM: Phase = Phase::new("Transform");
    /// Final observation point.
    pub const AFTER: Phase = Phase::new("After");
}

/// Phases of the receive (typed-body conversion) pipeline.
pub mod receive {
    use super::Phase;

    /// Before conversion starts.
    pub const BEFORE: Phase = Phase::new("Before");
    /// State inspection; validation re-applies here for responses the
    /// response pipeline never vetted.
    pub const STATE: Phase = Phase::new("State");
    /// After conversion.
    pub const AFTER: Phase = Phase::new("After");
}

/// Entry in the ordered phase set.
///
/// `after` remembers the anchor a phase was inserted after, so later
/// inserts against the same anchor land behind it (stable ties).
#[derive(Debug, Clone, Copy)]
struct Entry {
    phase: Phase,
    after: Option<Phase>,
}

/// The ordered set of phases of one pipeline.
#[derive(Debug, Clone, Default)]
pub struct Phases {
    entries: Vec<Entry>,
}

impl Phases {
    /// Creates an empty phase set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the phase is part of this set.
    #[must_use]
    pub fn contains(&self, phase: Phase) -> bool {
        self.entries.iter().any(|e| e.phase == phase)
    }

    /// Appends a phase at the end of the order.
    ///
    /// A phase already present is left where it is.
    pub fn push(&mut self, phase: Phase) {
        if !self.contains(phase) {
            self.entries.push(Entry { phase, after: None });
        }
    }

    /// Inserts `phase` immediately before `anchor`.
    ///
    /// Repeated inserts before the same anchor keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the anchor is not part of this
    /// set.
    pub fn insert_before(&mut self, anchor: Phase, phase: Phase) -> Result<()> {
        if self.contains(phase) {
            return Ok(());
        }
        let index = self.position(anchor)?;
        self.entries.insert(index, Entry { phase, after: None });
        Ok(())
    }

    /// Inserts `phase` after `anchor`, behind any phase previously
    /// inserted after the same anchor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the anchor is not part of this
    /// set.
    pub fn insert_after(&mut self, anchor: Phase, phase: Phase) -> Result<()> {
        if self.contains(phase) {
            return Ok(());
        }
        let mut index = self.position(anchor)? + 1;
        while self
            .entries
            .get(index)
            .is_some_and(|e| e.after == Some(anchor))
        {
            index += 1;
        }
        self.entries.insert(
            index,
            Entry {
                phase,
                after: Some(anchor),
            },
        );
        Ok(())
    }

    /// Iterates the phases in execution order.
    pub fn iter(&self) -> impl Iterator<Item = Phase> + '_ {
        self.entries.iter().map(|e| e.phase)
    }

    fn position(&self, phase: Phase) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.phase == phase)
            .ok_or(Error::UnknownPhase(phase.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    const A: Phase = Phase::new("A");
    const B: Phase = Phase::new("B");
    const C: Phase = Phase::new("C");
    const D: Phase = Phase::new("D");

    fn names(phases: &Phases) -> Vec<&'static str> {
        phases.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn append_keeps_registration_order() {
        let mut phases = Phases::new();
        phases.push(A);
        phases.push(B);
        phases.push(C);

        check!(names(&phases) == ["A", "B", "C"]);
    }

    #[test]
    fn insert_before_lands_directly_before_anchor() {
        let mut phases = Phases::new();
        phases.push(A);
        phases.push(C);

        phases.insert_before(C, B).expect("anchor exists");
        check!(names(&phases) == ["A", "B", "C"]);

        // Second insert before the same anchor stays behind the first.
        phases.insert_before(C, D).expect("anchor exists");
        check!(names(&phases) == ["A", "B", "D", "C"]);
    }

    #[test]
    fn insert_after_ties_are_stable() {
        let mut phases = Phases::new();
        phases.push(A);
        phases.push(D);

        phases.insert_after(A, B).expect("anchor exists");
        phases.insert_after(A, C).expect("anchor exists");

        check!(names(&phases) == ["A", "B", "C", "D"]);
    }

    #[test]
    fn duplicate_phase_is_ignored() {
        let mut phases = Phases::new();
        phases.push(A);
        phases.push(A);
        phases.insert_after(A, A).expect("no-op");

        check!(names(&phases) == ["A"]);
    }

    #[test]
    fn unknown_anchor_is_an_error() {
        let mut phases = Phases::new();
        phases.push(A);

        let result = phases.insert_after(B, C);
        let_assert!(Err(Error::UnknownPhase(name)) = result);
        check!(name == "B");
    }
}
