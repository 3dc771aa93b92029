//! Transition tables for demo phase chains
//!
//! A chain is a list of `Step`s: how long a phase dwells before the next one
//! takes over. Widgets look up their next step here instead of nesting timers.

/// One edge of a phase chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<P> {
    pub from: P,
    pub dwell_ms: u64,
    pub to: P,
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseTable<P: 'static> {
    steps: &'static [Step<P>],
}

impl<P: Copy + PartialEq> PhaseTable<P> {
    pub const fn new(steps: &'static [Step<P>]) -> Self {
        Self { steps }
    }

    /// Dwell time and successor for `from`, if it is not a terminal phase
    pub fn next(&self, from: P) -> Option<(u64, P)> {
        self.steps.iter().find(|s| s.from == from).map(|s| (s.dwell_ms, s.to))
    }

    /// Walk the chain from `start` until it returns to `start` or ends.
    /// The result starts with `start` and excludes the closing repeat.
    pub fn sequence(&self, start: P) -> Vec<P> {
        let mut seq = vec![start];
        let mut current = start;
        while let Some((_, to)) = self.next(current) {
            if to == start || seq.len() > self.steps.len() {
                break;
            }
            seq.push(to);
            current = to;
        }
        seq
    }

    /// Sum of all dwell times around the chain
    pub fn total_dwell_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.dwell_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Yellow,
    }

    const LIGHTS: PhaseTable<Light> = PhaseTable::new(&[
        Step { from: Light::Red, dwell_ms: 3000, to: Light::Green },
        Step { from: Light::Green, dwell_ms: 2500, to: Light::Yellow },
        Step { from: Light::Yellow, dwell_ms: 500, to: Light::Red },
    ]);

    #[test]
    fn test_next() {
        assert_eq!(LIGHTS.next(Light::Red), Some((3000, Light::Green)));
        assert_eq!(LIGHTS.next(Light::Yellow), Some((500, Light::Red)));
    }

    #[test]
    fn test_sequence_closes_loop() {
        assert_eq!(LIGHTS.sequence(Light::Red), vec![Light::Red, Light::Green, Light::Yellow]);
    }

    #[test]
    fn test_total_dwell() {
        assert_eq!(LIGHTS.total_dwell_ms(), 6000);
    }

    #[test]
    fn test_terminal_phase() {
        const SHORT: PhaseTable<Light> =
            PhaseTable::new(&[Step { from: Light::Red, dwell_ms: 10, to: Light::Green }]);
        assert_eq!(SHORT.next(Light::Green), None);
        assert_eq!(SHORT.sequence(Light::Red), vec![Light::Red, Light::Green]);
    }
}
