//! Gesture collectors: accumulate pointer strokes and hand them to a
//! matcher when a gesture ends.
//!
//! The unistroke collector triggers on the alive-set delta (a contact
//! lifted); the multistroke collector clusters strokes into spatial
//! components per user and triggers on inactivity.

use std::collections::BTreeMap;

use super::Adaptor;
use crate::bundle::BundleHandle;
use crate::error::Error;
use crate::geometry::Point2;
use crate::messages::{GestureIdentification, Message, Pointer};
use crate::types::{extract_removed_ids, SessionId, SessionSet, Timetag, UserId};

/// Scores per template, highest first.
pub type Scores = Vec<(f32, String)>;

/// A gesture recognizer the collectors can drive.
pub trait Matcher: Send {
    /// A human-readable name carried in the result messages.
    fn name(&self) -> &str;

    /// Score the strokes against the known templates.
    fn recognize(&self, strokes: &[Vec<Point2>]) -> Scores;
}

/// One timestamped sample of a stroke.
#[derive(Debug, Clone, Copy)]
struct PointTime {
    time: Timetag,
    point: Point2,
}

/// Insert keeping the buffer sorted by arrival time, so strokes survive
/// datagram reordering.
fn insert_in_order(samples: &mut Vec<PointTime>, sample: PointTime) {
    let position = samples
        .iter()
        .rposition(|existing| existing.time <= sample.time)
        .map(|index| index + 1)
        .unwrap_or(0);
    samples.insert(position, sample);
}

fn sort_scores(mut scores: Scores) -> Scores {
    scores.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

/// Collector for single-stroke gestures.
pub struct UnistrokeCollector<M: Matcher> {
    matcher: M,
    strokes: BTreeMap<(UserId, SessionId), Vec<PointTime>>,
    previous_alive: SessionSet,
}

impl<M: Matcher> UnistrokeCollector<M> {
    pub fn new(matcher: M) -> Self {
        UnistrokeCollector {
            matcher,
            strokes: BTreeMap::new(),
            previous_alive: SessionSet::new(),
        }
    }
}

impl<M: Matcher> Adaptor for UnistrokeCollector<M> {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error> {
        let (frame, alive) = match (bundle.frame(), bundle.alive()) {
            (Some(frame), Some(alive)) => (frame, alive),
            _ => return Err(Error::NoEnvelope),
        };
        let time = frame.time;

        for pointer in bundle.all_of::<Pointer>() {
            let key = (pointer.user_id, pointer.session_id);
            insert_in_order(
                self.strokes.entry(key).or_default(),
                PointTime { time, point: pointer.point.xy() },
            );
        }

        let removed = extract_removed_ids(&self.previous_alive, &alive.alives);
        self.previous_alive = alive.alives.clone();

        let mut results = Vec::new();
        let finished: Vec<(UserId, SessionId)> = self
            .strokes
            .keys()
            .filter(|(_, sid)| removed.contains(sid))
            .copied()
            .collect();
        for key in finished {
            let samples = self.strokes.remove(&key).unwrap();
            let stroke: Vec<Point2> = samples.iter().map(|s| s.point).collect();
            let scores = sort_scores(self.matcher.recognize(&[stroke]));
            results.push(GestureIdentification::new(
                self.matcher.name(),
                key.0,
                [key.1].into_iter().collect(),
                scores,
            ));
        }

        // recognition results slot in right before the alive trailer
        let mut output = BundleHandle::new();
        for message in bundle.iter() {
            if matches!(message, Message::Alive(_)) {
                for result in results.drain(..) {
                    output.push(Message::GestureIdentification(result));
                }
            }
            output.push(message.clone());
        }
        Ok(output)
    }
}

/// A cluster of strokes treated as one gesture.
struct Component {
    strokes: BTreeMap<SessionId, Vec<PointTime>>,
    /// Insertion order of the strokes, for packing.
    order: Vec<SessionId>,
    last_activity: Timetag,
}

impl Component {
    fn last_points(&self) -> impl Iterator<Item = Point2> + '_ {
        self.strokes.values().filter_map(|samples| samples.last().map(|s| s.point))
    }
}

/// Collector for multi-stroke gestures.
pub struct MultistrokeCollector<M: Matcher> {
    matcher: M,
    radius: f32,
    timeout: Timetag,
    components: BTreeMap<UserId, Vec<Component>>,
}

impl<M: Matcher> MultistrokeCollector<M> {
    pub fn new(matcher: M, radius: f32, timeout: Timetag) -> Self {
        MultistrokeCollector {
            matcher,
            radius,
            timeout,
            components: BTreeMap::new(),
        }
    }

    fn insert_point(&mut self, user: UserId, sid: SessionId, sample: PointTime) {
        let components = self.components.entry(user).or_default();

        // a stroke already in a component keeps feeding it
        if let Some(component) = components
            .iter_mut()
            .find(|component| component.strokes.contains_key(&sid))
        {
            insert_in_order(component.strokes.get_mut(&sid).unwrap(), sample);
            component.last_activity = component.last_activity.max(sample.time);
            return;
        }

        // otherwise the stroke joins the first component it lands near
        let radius = self.radius;
        let target = components.iter_mut().find(|component| {
            component.last_points().any(|last| {
                let dx = last.x - sample.point.x;
                let dy = last.y - sample.point.y;
                (dx * dx + dy * dy).sqrt() <= radius
            })
        });
        match target {
            Some(component) => {
                component.order.push(sid);
                component.strokes.insert(sid, vec![sample]);
                component.last_activity = component.last_activity.max(sample.time);
            }
            None => components.push(Component {
                strokes: [(sid, vec![sample])].into_iter().collect(),
                order: vec![sid],
                last_activity: sample.time,
            }),
        }
    }

    /// Recognize and drop every component inactive for at least the
    /// timeout; users without components left are dropped too.
    fn expire(&mut self, now: Timetag) -> Vec<GestureIdentification> {
        let mut results = Vec::new();
        let users: Vec<UserId> = self.components.keys().copied().collect();
        for user in users {
            let components = self.components.get_mut(&user).unwrap();
            let mut remaining = Vec::new();
            for component in components.drain(..) {
                if now.diff_abs(component.last_activity) < self.timeout {
                    remaining.push(component);
                    continue;
                }
                let strokes: Vec<Vec<Point2>> = component
                    .order
                    .iter()
                    .map(|sid| {
                        component.strokes[sid].iter().map(|s| s.point).collect()
                    })
                    .collect();
                let scores = sort_scores(self.matcher.recognize(&strokes));
                let sessions: SessionSet = component.order.iter().copied().collect();
                results.push(GestureIdentification::new(
                    self.matcher.name(),
                    user,
                    sessions,
                    scores,
                ));
            }
            if remaining.is_empty() {
                self.components.remove(&user);
            } else {
                *self.components.get_mut(&user).unwrap() = remaining;
            }
        }
        results
    }
}

impl<M: Matcher> Adaptor for MultistrokeCollector<M> {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error> {
        let frame = bundle.frame().ok_or(Error::NoEnvelope)?;
        let time = frame.time;

        for pointer in bundle.all_of::<Pointer>() {
            self.insert_point(
                pointer.user_id,
                pointer.session_id,
                PointTime { time, point: pointer.point.xy() },
            );
        }

        // the timeout check runs on frame-received wall time
        let mut results = self.expire(Timetag::now());

        let mut output = BundleHandle::new();
        for message in bundle.iter() {
            if matches!(message, Message::Alive(_)) {
                for result in results.drain(..) {
                    output.push(Message::GestureIdentification(result));
                }
            }
            output.push(message.clone());
        }
        Ok(output)
    }

    fn flush(&mut self) -> Vec<BundleHandle> {
        // gestures complete even when the sensor goes quiet
        let results = self.expire(Timetag::now());
        if results.is_empty() {
            return Vec::new();
        }
        let frame = crate::messages::Frame::new(0, Timetag::now());
        let middle = results
            .into_iter()
            .map(Message::GestureIdentification)
            .collect();
        vec![BundleHandle::assemble(
            frame,
            middle,
            crate::messages::Alive::default(),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Alive, Frame};

    struct StubMatcher;

    impl Matcher for StubMatcher {
        fn name(&self) -> &str {
            "stub"
        }

        fn recognize(&self, strokes: &[Vec<Point2>]) -> Scores {
            // score by total sample count so tests can assert on it
            let samples: usize = strokes.iter().map(|s| s.len()).sum();
            vec![(samples as f32, "count".into()), (0.5, "noise".into())]
        }
    }

    fn bundle(time: Timetag, pointers: &[(u16, u32, f32, f32)], alive: &[u32]) -> BundleHandle {
        let middle = pointers
            .iter()
            .map(|(user, sid, x, y)| {
                Message::Pointer(Pointer::new_2d(*sid, 0, *user, 0, *x, *y, 0.0, 1.0))
            })
            .collect();
        BundleHandle::assemble(
            Frame::new(1, time),
            middle,
            Alive::new(alive.iter().copied().collect()),
        )
    }

    #[test]
    fn test_unistroke_triggers_on_lift() {
        let mut collector = UnistrokeCollector::new(StubMatcher);
        collector
            .process_bundle(&bundle(Timetag::new(1, 0), &[(2, 7, 0.1, 0.1)], &[7]))
            .unwrap();
        collector
            .process_bundle(&bundle(Timetag::new(2, 0), &[(2, 7, 0.2, 0.2)], &[7]))
            .unwrap();
        // contact lifted: alive no longer carries 7
        let out = collector
            .process_bundle(&bundle(Timetag::new(3, 0), &[], &[]))
            .unwrap();
        let gid = out.nth_of::<GestureIdentification>(0).unwrap();
        assert_eq!(gid.recognizer, "stub");
        assert_eq!(gid.user_id, 2);
        assert!(gid.sessions.contains(&7));
        assert_eq!(gid.best().unwrap().0, 2.0);
        // result precedes the alive trailer
        assert!(matches!(out.messages()[out.len() - 2], Message::GestureIdentification(_)));
        assert!(matches!(out.messages()[out.len() - 1], Message::Alive(_)));
    }

    #[test]
    fn test_unistroke_orders_samples_by_timetag() {
        let mut collector = UnistrokeCollector::new(StubMatcher);
        // datagrams arrive out of order
        collector
            .process_bundle(&bundle(Timetag::new(5, 0), &[(0, 1, 0.5, 0.5)], &[1]))
            .unwrap();
        collector
            .process_bundle(&bundle(Timetag::new(4, 0), &[(0, 1, 0.4, 0.4)], &[1]))
            .unwrap();
        let samples = collector.strokes.get(&(0, 1)).unwrap();
        assert!(samples[0].time < samples[1].time);
    }

    #[test]
    fn test_unistroke_keeps_unrelated_strokes() {
        let mut collector = UnistrokeCollector::new(StubMatcher);
        collector
            .process_bundle(&bundle(
                Timetag::new(1, 0),
                &[(0, 1, 0.1, 0.1), (0, 2, 0.9, 0.9)],
                &[1, 2],
            ))
            .unwrap();
        let out = collector
            .process_bundle(&bundle(Timetag::new(2, 0), &[(0, 2, 0.8, 0.8)], &[2]))
            .unwrap();
        // only stroke 1 was recognized; stroke 2 keeps collecting
        let gid = out.nth_of::<GestureIdentification>(0).unwrap();
        assert!(gid.sessions.contains(&1));
        assert!(collector.strokes.contains_key(&(0, 2)));
        assert!(!collector.strokes.contains_key(&(0, 1)));
    }

    #[test]
    fn test_multistroke_clusters_by_radius() {
        let mut collector = MultistrokeCollector::new(StubMatcher, 1.0, Timetag::new(1000, 0));
        let t = Timetag::new(1, 0);
        collector
            .process_bundle(&bundle(t, &[(0, 1, 0.0, 0.0)], &[1]))
            .unwrap();
        // near the first stroke's last point: same component
        collector
            .process_bundle(&bundle(t, &[(0, 2, 0.5, 0.0)], &[2]))
            .unwrap();
        // far away: new component
        collector
            .process_bundle(&bundle(t, &[(0, 3, 100.0, 100.0)], &[3]))
            .unwrap();
        assert_eq!(collector.components[&0].len(), 2);
        assert_eq!(collector.components[&0][0].strokes.len(), 2);
    }

    #[test]
    fn test_multistroke_expiry_packs_strokes_in_insertion_order() {
        let mut collector = MultistrokeCollector::new(StubMatcher, 1.0, Timetag::new(0, 1));
        let old = Timetag::new(1, 0);
        collector
            .process_bundle(&bundle(old, &[(4, 1, 0.0, 0.0)], &[1]))
            .unwrap();
        collector
            .process_bundle(&bundle(old, &[(4, 2, 0.5, 0.0)], &[2]))
            .unwrap();

        let results = collector.expire(Timetag::now());
        assert_eq!(results.len(), 1);
        let gid = &results[0];
        assert_eq!(gid.user_id, 4);
        assert_eq!(gid.sessions.len(), 2);
        assert_eq!(gid.best().unwrap().0, 2.0);
        // the user entry is gone once its last component expired
        assert!(collector.components.is_empty());
    }

    #[test]
    fn test_multistroke_active_component_survives() {
        let mut collector = MultistrokeCollector::new(StubMatcher, 1.0, Timetag::new(1000, 0));
        collector
            .process_bundle(&bundle(Timetag::now(), &[(0, 1, 0.0, 0.0)], &[1]))
            .unwrap();
        let results = collector.expire(Timetag::now());
        assert!(results.is_empty());
        assert_eq!(collector.components[&0].len(), 1);
    }

    #[test]
    fn test_scores_sorted_descending() {
        let scores = sort_scores(vec![(0.1, "a".into()), (0.9, "b".into()), (0.5, "c".into())]);
        assert_eq!(scores[0].1, "b");
        assert_eq!(scores[2].1, "a");
    }
}
