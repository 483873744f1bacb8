//! Touch re-identification: stitches short-lived session ids that belong to
//! the same physical contact across reporting gaps.
//!
//! When a contact disappears, its mapped id is parked in a join pool; a new
//! contact appearing close enough in space and time claims the parked id
//! instead of a fresh one. Pool entries expire after twice the join window.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::Adaptor;
use crate::bundle::BundleHandle;
use crate::error::Error;
use crate::geometry::Point3;
use crate::messages::{Frame, Message};
use crate::types::{extract_removed_ids, FrameId, SessionId, SessionSet, Timetag};

const COORD_OUT_OF_BOUNDS: f32 = f32::MAX;

/// Identity of an emitter as far as stitching is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SourceKey {
    address: u32,
    instance: u32,
}

impl SourceKey {
    fn from_frame(frame: &Frame) -> Self {
        SourceKey { address: frame.address, instance: frame.instance }
    }
}

/// A dropped contact waiting in the join pool.
#[derive(Debug, Clone)]
struct PoolEntry {
    session_id: SessionId,
    last: Point3,
    since: Timetag,
    waiting_since: Timetag,
}

#[derive(Debug, Clone, Copy)]
struct MappedEntry {
    mapped_sid: SessionId,
}

pub struct PrimitiveTouch {
    join_threshold_squared: f32,
    delta_time: Timetag,
    mapping: HashMap<SourceKey, IndexMap<SessionId, MappedEntry>>,
    /// Last known position per mapped id.
    objects: HashMap<SessionId, Point3>,
    avail_to_join: Vec<PoolEntry>,
    next_mapped_id: SessionId,
    next_frame_id: FrameId,
    /// Frame template used when garbage collection must republish alives.
    last_frame: Option<Frame>,
}

impl Default for PrimitiveTouch {
    fn default() -> Self {
        // 4000 distance units and 0.4 s, the tuning the adaptor ships with
        PrimitiveTouch::new(4000.0, Timetag::new(0, (u32::MAX / 10) * 4))
    }
}

impl PrimitiveTouch {
    pub fn new(join_threshold: f32, delta_time: Timetag) -> Self {
        PrimitiveTouch {
            join_threshold_squared: join_threshold * join_threshold,
            delta_time,
            mapping: HashMap::new(),
            objects: HashMap::new(),
            avail_to_join: Vec::new(),
            next_mapped_id: 1,
            next_frame_id: 1,
            last_frame: None,
        }
    }

    pub fn set_join_threshold(&mut self, threshold: f32) {
        self.join_threshold_squared = threshold * threshold;
    }

    pub fn set_delta_time(&mut self, delta: Timetag) {
        self.delta_time = delta;
    }

    fn next_frame_id(&mut self) -> FrameId {
        let id = self.next_frame_id;
        self.next_frame_id = self.next_frame_id.wrapping_add(1);
        id
    }

    /// Claim a parked id whose distance and age both fit, or allocate a
    /// fresh one.
    fn allocate_mapped_id(&mut self, at: Point3, since: Timetag) -> SessionId {
        let mut claimed = None;
        for (index, entry) in self.avail_to_join.iter().enumerate() {
            let dx = entry.last.x - at.x;
            let dy = entry.last.y - at.y;
            let dz = entry.last.z - at.z;
            let dist_squared = dx * dx + dy * dy + dz * dz;
            if dist_squared <= self.join_threshold_squared
                && since.diff_abs(entry.since) < self.delta_time
            {
                claimed = Some(index);
                break;
            }
        }
        match claimed {
            Some(index) => self.avail_to_join.remove(index).session_id,
            None => {
                let sid = self.next_mapped_id;
                self.next_mapped_id += 1;
                sid
            }
        }
    }

    /// Currently exported alive set: every mapped id plus the join pool.
    fn exported_alives(&self) -> SessionSet {
        let mut alives: SessionSet = self
            .mapping
            .values()
            .flat_map(|srcmap| srcmap.values().map(|e| e.mapped_sid))
            .collect();
        alives.extend(self.avail_to_join.iter().map(|e| e.session_id));
        alives
    }

    /// Park mappings whose local id left the source's alive set; map any
    /// announced id that never produced a pointer. Mark-and-sweep, nothing
    /// is erased mid-scan.
    fn update_idmap(&mut self, source: &SourceKey, frame_time: Timetag, update: &SessionSet) {
        let srcmap = self.mapping.entry(source.clone()).or_default();
        let present: SessionSet = srcmap.keys().copied().collect();
        let removed = extract_removed_ids(&present, update);

        let mut parked = Vec::new();
        for local in &removed {
            if let Some(entry) = srcmap.shift_remove(local) {
                parked.push(entry.mapped_sid);
            }
        }
        for mapped_sid in parked {
            let last = self
                .objects
                .get(&mapped_sid)
                .copied()
                .unwrap_or(Point3::new(COORD_OUT_OF_BOUNDS, COORD_OUT_OF_BOUNDS, COORD_OUT_OF_BOUNDS));
            self.avail_to_join.push(PoolEntry {
                session_id: mapped_sid,
                last,
                since: frame_time,
                waiting_since: Timetag::now(),
            });
        }

        // ids alive without a positional message still need a mapping
        let missing: Vec<SessionId> = update
            .iter()
            .filter(|local| !self.mapping[source].contains_key(*local))
            .copied()
            .collect();
        for local in missing {
            let out_of_bounds =
                Point3::new(COORD_OUT_OF_BOUNDS, COORD_OUT_OF_BOUNDS, COORD_OUT_OF_BOUNDS);
            let sid = self.allocate_mapped_id(out_of_bounds, frame_time);
            self.mapping
                .get_mut(source)
                .unwrap()
                .insert(local, MappedEntry { mapped_sid: sid });
        }
    }

    /// Drop pool entries that waited longer than twice the join window.
    /// Returns true when anything was dropped.
    fn collect_garbage(&mut self, now: Timetag) -> bool {
        let droptime = self.delta_time.add(self.delta_time);
        let expired: Vec<usize> = self
            .avail_to_join
            .iter()
            .enumerate()
            .filter(|(_, entry)| droptime < now.diff_abs(entry.waiting_since))
            .map(|(index, _)| index)
            .collect();
        if expired.is_empty() {
            return false;
        }
        for index in expired.into_iter().rev() {
            let entry = self.avail_to_join.remove(index);
            self.objects.remove(&entry.session_id);
        }
        true
    }
}

impl Adaptor for PrimitiveTouch {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error> {
        let (frame, alive) = match (bundle.frame(), bundle.alive()) {
            (Some(frame), Some(alive)) => (frame.clone(), alive.clone()),
            _ => return Err(Error::NoEnvelope),
        };
        let source = SourceKey::from_frame(&frame);
        let frame_time = frame.time;
        self.last_frame = Some(frame.clone());

        let mut output = BundleHandle::new();
        for message in bundle.iter() {
            let mut out = message.clone();
            match &mut out {
                Message::Frame(out_frame) => {
                    out_frame.frame_id = self.next_frame_id();
                }
                Message::Alive(out_alive) => {
                    out_alive.alives = self.exported_alives();
                }
                other => {
                    if let (Some(local_sid), Some(point)) = (other.session_id(), other.point()) {
                        let mapped = self
                            .mapping
                            .entry(source.clone())
                            .or_default()
                            .get(&local_sid)
                            .map(|e| e.mapped_sid);
                        let sid = match mapped {
                            Some(sid) => sid,
                            None => {
                                let sid = self.allocate_mapped_id(point, frame_time);
                                self.mapping
                                    .get_mut(&source)
                                    .unwrap()
                                    .insert(local_sid, MappedEntry { mapped_sid: sid });
                                sid
                            }
                        };
                        self.objects.insert(sid, point);
                        other.set_session_id(sid);
                    }
                }
            }
            output.push(out);
        }

        self.update_idmap(&source, frame_time, &alive.alives);
        Ok(output)
    }

    fn flush(&mut self) -> Vec<BundleHandle> {
        if !self.collect_garbage(Timetag::now()) {
            return Vec::new();
        }
        // republish the shrunken alive set so downstream state converges
        let Some(template) = self.last_frame.clone() else {
            return Vec::new();
        };
        let mut frame = template;
        frame.frame_id = self.next_frame_id();
        frame.time = Timetag::now();
        let alive = crate::messages::Alive::new(self.exported_alives());
        vec![BundleHandle::assemble(frame, Vec::new(), alive)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Alive, Pointer};

    fn bundle(frame_id: u32, time: Timetag, pointers: &[(u32, f32, f32)]) -> BundleHandle {
        let frame = Frame::extended(frame_id, time, "src", 1, 1, 0, 0);
        let middle = pointers
            .iter()
            .map(|(sid, x, y)| {
                Message::Pointer(Pointer::new_2d(*sid, 0, 0, 0, *x, *y, 0.0, 1.0))
            })
            .collect();
        BundleHandle::assemble(
            frame,
            middle,
            Alive::new(pointers.iter().map(|(sid, _, _)| *sid).collect()),
        )
    }

    fn mapped_sid(out: &BundleHandle) -> SessionId {
        out.nth_of::<Pointer>(0).unwrap().session_id
    }

    #[test]
    fn test_stable_mapping_while_alive() {
        let mut touch = PrimitiveTouch::new(10.0, Timetag::new(1, 0));
        let a = touch
            .process_bundle(&bundle(1, Timetag::new(10, 0), &[(17, 5.0, 5.0)]))
            .unwrap();
        let b = touch
            .process_bundle(&bundle(2, Timetag::new(10, 1), &[(17, 6.0, 5.0)]))
            .unwrap();
        assert_eq!(mapped_sid(&a), mapped_sid(&b));
    }

    #[test]
    fn test_rejoin_within_thresholds() {
        let mut touch = PrimitiveTouch::new(10.0, Timetag::new(1, 0));
        let first = touch
            .process_bundle(&bundle(1, Timetag::new(10, 0), &[(17, 5.0, 5.0)]))
            .unwrap();
        let original = mapped_sid(&first);

        // contact disappears
        touch
            .process_bundle(&bundle(2, Timetag::new(10, 100), &[]))
            .unwrap();

        // a new local id reappears nearby, quickly
        let second = touch
            .process_bundle(&bundle(3, Timetag::new(10, 200), &[(99, 6.0, 5.0)]))
            .unwrap();
        assert_eq!(mapped_sid(&second), original);
    }

    #[test]
    fn test_no_claim_beyond_distance_threshold() {
        let mut touch = PrimitiveTouch::new(10.0, Timetag::new(1, 0));
        let first = touch
            .process_bundle(&bundle(1, Timetag::new(10, 0), &[(17, 5.0, 5.0)]))
            .unwrap();
        let original = mapped_sid(&first);

        touch.process_bundle(&bundle(2, Timetag::new(10, 100), &[])).unwrap();

        let second = touch
            .process_bundle(&bundle(3, Timetag::new(10, 200), &[(99, 500.0, 5.0)]))
            .unwrap();
        assert_ne!(mapped_sid(&second), original);
    }

    #[test]
    fn test_no_claim_beyond_time_threshold() {
        let mut touch = PrimitiveTouch::new(10.0, Timetag::new(1, 0));
        let first = touch
            .process_bundle(&bundle(1, Timetag::new(10, 0), &[(17, 5.0, 5.0)]))
            .unwrap();
        let original = mapped_sid(&first);

        touch.process_bundle(&bundle(2, Timetag::new(10, 0), &[])).unwrap();

        // same spot, but far outside the join window
        let second = touch
            .process_bundle(&bundle(3, Timetag::new(20, 0), &[(99, 5.0, 5.0)]))
            .unwrap();
        assert_ne!(mapped_sid(&second), original);
    }

    #[test]
    fn test_alive_includes_pool_entries() {
        let mut touch = PrimitiveTouch::new(10.0, Timetag::new(1, 0));
        let first = touch
            .process_bundle(&bundle(1, Timetag::new(10, 0), &[(17, 5.0, 5.0)]))
            .unwrap();
        let original = mapped_sid(&first);

        // the dropped contact stays exported while parked in the pool
        let second = touch
            .process_bundle(&bundle(2, Timetag::new(10, 100), &[]))
            .unwrap();
        assert!(second.alive().unwrap().contains(original));
    }

    #[test]
    fn test_frame_ids_rewritten() {
        let mut touch = PrimitiveTouch::default();
        let out = touch
            .process_bundle(&bundle(777, Timetag::new(10, 0), &[(1, 0.0, 0.0)]))
            .unwrap();
        assert_eq!(out.frame().unwrap().frame_id, 1);
        let out = touch
            .process_bundle(&bundle(778, Timetag::new(10, 1), &[(1, 0.0, 0.0)]))
            .unwrap();
        assert_eq!(out.frame().unwrap().frame_id, 2);
    }

    #[test]
    fn test_garbage_collection_emits_update() {
        let mut touch = PrimitiveTouch::new(10.0, Timetag::new(0, 1));
        touch
            .process_bundle(&bundle(1, Timetag::new(10, 0), &[(17, 5.0, 5.0)]))
            .unwrap();
        touch.process_bundle(&bundle(2, Timetag::new(10, 5), &[])).unwrap();

        // force expiry regardless of wall clock
        for entry in touch.avail_to_join.iter_mut() {
            entry.waiting_since = Timetag::new(0, 0);
        }
        let flushed = touch.flush();
        assert_eq!(flushed.len(), 1);
        assert!(flushed[0].alive().unwrap().alives.is_empty());
        assert!(touch.avail_to_join.is_empty());
    }
}
