//! Gain parameter automation as the audio graph applies it.
//!
//! `AutomationLane` holds step points (`setValueAtTime`): the value at `t`
//! is that of the latest point at or before `t`. `TargetParam` approaches
//! its target exponentially (`setTargetAtTime`), which is how the live
//! player eases engine values onto the graph.

/// Stepwise automation built from discrete `(time, value)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationLane {
    initial: f64,
    points: Vec<(f64, f64)>,
}

impl AutomationLane {
    /// A lane that reads `initial` until its first point.
    pub fn new(initial: f64) -> Self {
        AutomationLane {
            initial,
            points: Vec::new(),
        }
    }

    /// Schedule `value` from `time` onwards. A point at an already
    /// scheduled time replaces it.
    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        let idx = self.points.partition_point(|&(t, _)| t < time);
        match self.points.get_mut(idx) {
            Some(point) if point.0 == time => point.1 = value,
            _ => self.points.insert(idx, (time, value)),
        }
    }

    pub fn value_at(&self, time: f64) -> f64 {
        let idx = self.points.partition_point(|&(t, _)| t <= time);
        if idx == 0 {
            self.initial
        } else {
            self.points[idx - 1].1
        }
    }

    /// Read the lane at non-decreasing times without searching.
    pub fn reader(&self) -> LaneReader<'_> {
        LaneReader {
            lane: self,
            next: 0,
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Forward-only cursor over an [`AutomationLane`].
#[derive(Debug, Clone)]
pub struct LaneReader<'a> {
    lane: &'a AutomationLane,
    /// First point after the last queried time.
    next: usize,
}

impl LaneReader<'_> {
    /// Same as [`AutomationLane::value_at`] for queries in non-decreasing
    /// order. An earlier query than the previous one reads the previous
    /// value.
    pub fn value_at(&mut self, time: f64) -> f64 {
        let points = &self.lane.points;
        while self.next < points.len() && points[self.next].0 <= time {
            self.next += 1;
        }
        match self.next {
            0 => self.lane.initial,
            n => points[n - 1].1,
        }
    }
}

/// A parameter easing toward its latest target with a time constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetParam {
    start_value: f64,
    start_time: f64,
    target: f64,
    time_constant: f64,
}

impl TargetParam {
    pub fn new(value: f64) -> Self {
        TargetParam {
            start_value: value,
            start_time: 0.0,
            target: value,
            time_constant: 0.0,
        }
    }

    /// Begin approaching `target` at `now`, starting from wherever the
    /// previous approach had reached.
    pub fn set_target_at_time(&mut self, target: f64, now: f64, time_constant: f64) {
        self.start_value = self.value_at(now);
        self.start_time = now;
        self.target = target;
        self.time_constant = time_constant;
    }

    pub fn value_at(&self, now: f64) -> f64 {
        let dt = now - self.start_time;
        if dt <= 0.0 {
            return self.start_value;
        }
        if self.time_constant <= 0.0 {
            return self.target;
        }
        self.target + (self.start_value - self.target) * (-dt / self.time_constant).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_steps_between_points() {
        let mut lane = AutomationLane::new(0.25);
        lane.set_value_at_time(0.5, 1.0);
        lane.set_value_at_time(0.75, 2.0);
        assert_eq!(lane.value_at(0.5), 0.25);
        assert_eq!(lane.value_at(1.0), 0.5);
        assert_eq!(lane.value_at(1.99), 0.5);
        assert_eq!(lane.value_at(2.0), 0.75);
        assert_eq!(lane.value_at(100.0), 0.75);
    }

    #[test]
    fn lane_keeps_points_sorted_and_unique() {
        let mut lane = AutomationLane::new(0.0);
        lane.set_value_at_time(3.0, 3.0);
        lane.set_value_at_time(1.0, 1.0);
        lane.set_value_at_time(2.0, 2.0);
        lane.set_value_at_time(9.0, 2.0);
        assert_eq!(lane.points(), &[(1.0, 1.0), (2.0, 9.0), (3.0, 3.0)]);
        assert_eq!(lane.len(), 3);
    }

    #[test]
    fn target_param_approaches_exponentially() {
        let mut p = TargetParam::new(0.0);
        p.set_target_at_time(1.0, 10.0, 0.3);
        assert_eq!(p.value_at(10.0), 0.0);
        let one_tau = p.value_at(10.3);
        assert!((one_tau - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
        assert!((p.value_at(15.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn retarget_starts_from_current_value() {
        let mut p = TargetParam::new(0.0);
        p.set_target_at_time(1.0, 0.0, 0.5);
        let mid = p.value_at(0.5);
        p.set_target_at_time(0.0, 0.5, 0.5);
        assert_eq!(p.value_at(0.5), mid);
        assert!(p.value_at(1.0) < mid);
    }

    #[test]
    fn reader_matches_lane_lookups() {
        let mut lane = AutomationLane::new(0.1);
        for k in 1..=20 {
            lane.set_value_at_time(k as f64 * 0.05, k as f64 * 0.1);
        }
        let mut reader = lane.reader();
        for n in 0..2500 {
            let t = n as f64 / 1000.0;
            assert_eq!(reader.value_at(t), lane.value_at(t), "at {t}");
        }
    }

    #[test]
    fn reader_on_empty_lane_reads_initial() {
        let lane = AutomationLane::new(0.4);
        let mut reader = lane.reader();
        assert_eq!(reader.value_at(0.0), 0.4);
        assert_eq!(reader.value_at(1e9), 0.4);
    }
}
