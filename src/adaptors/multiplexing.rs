//! Multi-source multiplexer: rewrites session ids from many sensors into a
//! single coherent id space.
//!
//! Sources are keyed by `(address, instance, app_name)` from each incoming
//! frame. The per-source mapping is stable while the local id stays alive;
//! dropped ids release their global id, which is never reused within a run.

use indexmap::IndexMap;
use tracing::warn;

use super::Adaptor;
use crate::bundle::BundleHandle;
use crate::error::Error;
use crate::messages::{Frame, Message};
use crate::types::{SessionId, SessionSet};

/// Identity of a logical emitter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub address: u32,
    pub instance: u32,
    pub app_name: String,
}

impl SourceKey {
    fn from_frame(frame: &Frame) -> Self {
        SourceKey {
            address: frame.address,
            instance: frame.instance,
            app_name: frame.app_name.clone(),
        }
    }
}

type LocalMap = IndexMap<SessionId, SessionId>;

pub struct MultiplexingAdaptor {
    next_global_id: SessionId,
    mapping: IndexMap<SourceKey, LocalMap>,
    associations: IndexMap<SourceKey, SessionSet>,
}

impl Default for MultiplexingAdaptor {
    fn default() -> Self {
        MultiplexingAdaptor::new()
    }
}

impl MultiplexingAdaptor {
    pub fn new() -> Self {
        MultiplexingAdaptor {
            next_global_id: 1,
            mapping: IndexMap::new(),
            associations: IndexMap::new(),
        }
    }

    /// Translate a local id, allocating a fresh global id on first sight.
    /// Allocation order follows insertion order within a bundle.
    fn mapped_id(&mut self, source: &SourceKey, sid: SessionId) -> SessionId {
        let srcmap = self.mapping.entry(source.clone()).or_default();
        if let Some(global) = srcmap.get(&sid).copied() {
            return global;
        }
        let global = self.next_global_id;
        self.next_global_id += 1;
        srcmap.insert(sid, global);
        global
    }

    /// Drop mappings whose local id left the source's alive set, then make
    /// sure every announced id is mapped.
    fn update_alives(&mut self, source: &SourceKey, update: &SessionSet) {
        let srcmap = self.mapping.entry(source.clone()).or_default();
        let stale: Vec<SessionId> = srcmap
            .keys()
            .filter(|local| !update.contains(local))
            .copied()
            .collect();
        for local in stale {
            srcmap.shift_remove(&local);
        }
        for local in update {
            self.mapped_id(source, *local);
        }
    }

    /// Union of all currently mapped global ids across sources.
    fn global_alives(&self) -> SessionSet {
        self.mapping
            .values()
            .flat_map(|srcmap| srcmap.values().copied())
            .collect()
    }

    /// Union of all sources' mapped association sets.
    fn global_associations(&self) -> SessionSet {
        self.associations.values().flatten().copied().collect()
    }
}

impl Adaptor for MultiplexingAdaptor {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error> {
        let source = match bundle.frame() {
            Some(frame) => SourceKey::from_frame(frame),
            None => {
                // no envelope; forward unchanged without advancing state
                warn!("multiplexer: bundle without frame envelope forwarded unchanged");
                return Ok(bundle.clone());
            }
        };

        let mut output = BundleHandle::new();
        for message in bundle.iter() {
            let mut out = message.clone();
            match &mut out {
                Message::Frame(_) => {}
                Message::Alive(alive) => {
                    self.update_alives(&source, &alive.alives);
                    alive.alives = self.global_alives();
                }
                Message::AliveAssociations(ala) => {
                    let mapped: SessionSet = ala
                        .associations
                        .iter()
                        .map(|sid| self.mapped_id(&source, *sid))
                        .collect();
                    self.associations.insert(source.clone(), mapped);
                    ala.associations = self.global_associations();
                }
                Message::ContainerAssociation(coa) => {
                    coa.session_id = self.mapped_id(&source, coa.session_id);
                    coa.associations = coa
                        .associations
                        .iter()
                        .map(|sid| self.mapped_id(&source, *sid))
                        .collect();
                }
                Message::LinkAssociation(lia) => {
                    lia.remap_session_ids(|sid| self.mapped_id(&source, sid));
                }
                Message::LinkedListAssociation(lla) => {
                    lla.remap_session_ids(|sid| self.mapped_id(&source, sid));
                }
                Message::LinkedTreeAssociation(lta) => {
                    lta.remap_session_ids(|sid| self.mapped_id(&source, sid));
                }
                other => {
                    if let Some(sid) = other.session_id() {
                        other.set_session_id(self.mapped_id(&source, sid));
                    }
                }
            }
            output.push(out);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Alive, Pointer};
    use crate::types::Timetag;

    fn bundle_from(address: u32, frame_id: u32, alives: &[u32]) -> BundleHandle {
        let frame = Frame::extended(frame_id, Timetag::new(1, 0), "src", address, 1, 0, 0);
        let pointers: Vec<Message> = alives
            .iter()
            .map(|sid| Message::Pointer(Pointer::new_2d(*sid, 0, 0, 0, 0.5, 0.5, 0.0, 1.0)))
            .collect();
        BundleHandle::assemble(frame, pointers, Alive::new(alives.iter().copied().collect()))
    }

    fn alive_set(bundle: &BundleHandle) -> SessionSet {
        bundle.alive().unwrap().alives.clone()
    }

    #[test]
    fn test_disjoint_sources_get_distinct_globals() {
        // two sources both announce local id 17 with different frame addresses
        let mut mux = MultiplexingAdaptor::new();
        let a = mux.process_bundle(&bundle_from(0x0a000001, 1, &[17])).unwrap();
        let b = mux.process_bundle(&bundle_from(0x0a000002, 1, &[17])).unwrap();

        let sid_a = a.nth_of::<Pointer>(0).unwrap().session_id;
        let sid_b = b.nth_of::<Pointer>(0).unwrap().session_id;
        assert_ne!(sid_a, sid_b);
        // both alive once both sources reported
        assert!(alive_set(&b).contains(&sid_a));
        assert!(alive_set(&b).contains(&sid_b));
    }

    #[test]
    fn test_overlapping_lifecycle_allocates_monotonically() {
        let mut mux = MultiplexingAdaptor::new();
        let source = 0x0a000001;

        let out1 = mux.process_bundle(&bundle_from(source, 1, &[17])).unwrap();
        let g17 = out1.nth_of::<Pointer>(0).unwrap().session_id;

        let out2 = mux.process_bundle(&bundle_from(source, 2, &[17, 18])).unwrap();
        let g18 = *alive_set(&out2).iter().find(|sid| **sid != g17).unwrap();
        assert!(g18 > g17);

        let out3 = mux.process_bundle(&bundle_from(source, 3, &[18, 19])).unwrap();
        let set3 = alive_set(&out3);
        assert!(!set3.contains(&g17), "dropped id released in the same bundle");
        assert!(set3.contains(&g18), "mapping stable while alive");
        let g19 = *set3.iter().find(|sid| **sid != g18).unwrap();
        assert!(g19 > g18);

        let out4 = mux.process_bundle(&bundle_from(source, 4, &[20])).unwrap();
        let set4 = alive_set(&out4);
        assert_eq!(set4.len(), 1);
        let g20 = *set4.iter().next().unwrap();
        assert!(g20 > g19, "released ids are never reused");

        let out5 = mux.process_bundle(&bundle_from(source, 5, &[])).unwrap();
        assert!(alive_set(&out5).is_empty());
    }

    #[test]
    fn test_mapping_intersection_property() {
        // G(A1) ∩ G(A2) == G(A1 ∩ A2) for consecutive observations
        let mut mux = MultiplexingAdaptor::new();
        let source = 0x0a000001;

        let out1 = mux.process_bundle(&bundle_from(source, 1, &[1, 2, 3])).unwrap();
        let g1 = alive_set(&out1);
        let out2 = mux.process_bundle(&bundle_from(source, 2, &[2, 3, 4])).unwrap();
        let g2 = alive_set(&out2);

        let survived: SessionSet = g1.intersection(&g2).copied().collect();
        // locals 2 and 3 survive, so exactly two globals are common
        assert_eq!(survived.len(), 2);
    }

    #[test]
    fn test_no_envelope_forwarded_unchanged() {
        let mut mux = MultiplexingAdaptor::new();
        let mut bundle = BundleHandle::new();
        bundle.push(Message::Pointer(Pointer::new_2d(9, 0, 0, 0, 0.5, 0.5, 0.0, 1.0)));
        let out = mux.process_bundle(&bundle).unwrap();
        assert_eq!(out, bundle);
    }

    #[test]
    fn test_container_association_members_remapped() {
        use crate::messages::ContainerAssociation;
        let mut mux = MultiplexingAdaptor::new();
        let source = 0x0a000001;

        let frame = Frame::extended(1, Timetag::new(1, 0), "src", source, 1, 0, 0);
        let coa = ContainerAssociation::new(17, 0, [18, 19].into_iter().collect());
        let bundle = BundleHandle::assemble(
            frame,
            vec![Message::ContainerAssociation(coa)],
            Alive::new([17, 18, 19].into_iter().collect()),
        );
        let out = mux.process_bundle(&bundle).unwrap();
        let mapped = out.nth_of::<ContainerAssociation>(0).unwrap();
        // every embedded id went through the same per-source map
        let alive = alive_set(&out);
        assert!(alive.contains(&mapped.session_id));
        for member in &mapped.associations {
            assert!(alive.contains(member));
        }
        assert_eq!(mapped.associations.len(), 2);
    }
}
