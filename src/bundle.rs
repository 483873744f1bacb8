use std::collections::VecDeque;

use crate::messages::{Alive, Frame, Message, Payload};
use crate::types::SessionId;

/// One OSC bundle's worth of TUIO messages.
///
/// A well-formed handle starts with exactly one `frm`, ends with exactly one
/// `alv`, and owns deep copies of everything in between.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BundleHandle {
    messages: Vec<Message>,
}

impl BundleHandle {
    pub fn new() -> Self {
        BundleHandle::default()
    }

    /// Build a well-formed handle from envelope and middle messages.
    pub fn assemble(frame: Frame, middle: Vec<Message>, alive: Alive) -> Self {
        let mut messages = Vec::with_capacity(middle.len() + 2);
        messages.push(Message::Frame(frame));
        messages.extend(middle);
        messages.push(Message::Alive(alive));
        BundleHandle { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Message> {
        self.messages.iter_mut()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The envelope frame, when the handle is well-formed.
    pub fn frame(&self) -> Option<&Frame> {
        self.messages.first().and_then(Frame::from_message)
    }

    pub fn frame_mut(&mut self) -> Option<&mut Frame> {
        self.messages.first_mut().and_then(Frame::from_message_mut)
    }

    /// The trailing alive set, when the handle is well-formed.
    pub fn alive(&self) -> Option<&Alive> {
        self.messages.last().and_then(Alive::from_message)
    }

    pub fn alive_mut(&mut self) -> Option<&mut Alive> {
        self.messages.last_mut().and_then(Alive::from_message_mut)
    }

    /// Envelope check: one frame at the start, one alive at the end, no
    /// other envelope messages in between.
    pub fn is_well_formed(&self) -> bool {
        if self.frame().is_none() || self.alive().is_none() {
            return false;
        }
        !self
            .messages
            .iter()
            .skip(1)
            .take(self.messages.len().saturating_sub(2))
            .any(|m| matches!(m, Message::Frame(_) | Message::Alive(_)))
    }

    /// The n-th message of the given payload type.
    pub fn nth_of<T: Payload>(&self, n: usize) -> Option<&T> {
        self.messages.iter().filter_map(T::from_message).nth(n)
    }

    /// All messages of the given payload type, in positional order.
    pub fn all_of<'a, T: Payload + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.messages.iter().filter_map(T::from_message)
    }

    /// Session ids referenced by contact messages (not the alive set).
    pub fn referenced_session_ids(&self) -> Vec<SessionId> {
        self.messages.iter().filter_map(Message::session_id).collect()
    }
}

impl IntoIterator for BundleHandle {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a BundleHandle {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Position addressing for [`BundleStack::get_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackIndex {
    /// Pop from the head (the oldest received bundle).
    Oldest,
    /// Take the tail (the most recently received bundle).
    Newest,
    /// Take the n-th bundle counted from the head.
    Nth(usize),
}

/// FIFO of bundle handles between a producer and its listeners.
#[derive(Debug, Clone, Default)]
pub struct BundleStack {
    handles: VecDeque<BundleHandle>,
}

impl BundleStack {
    pub fn new() -> Self {
        BundleStack::default()
    }

    /// Append a handle; empty handles are rejected.
    pub fn append(&mut self, handle: BundleHandle) -> bool {
        if handle.is_empty() {
            return false;
        }
        self.handles.push_back(handle);
        true
    }

    /// Remove and return the handle at the given slot.
    pub fn get_update(&mut self, index: StackIndex) -> Option<BundleHandle> {
        match index {
            StackIndex::Oldest => self.handles.pop_front(),
            StackIndex::Newest => self.handles.pop_back(),
            StackIndex::Nth(n) => self.handles.remove(n),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &BundleHandle> {
        self.handles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Pointer;
    use crate::types::Timetag;

    fn sample_bundle(frame_id: u32, sid: u32) -> BundleHandle {
        BundleHandle::assemble(
            Frame::new(frame_id, Timetag::new(1, 0)),
            vec![Message::Pointer(Pointer::new_2d(sid, 0, 0, 0, 0.5, 0.5, 0.0, 1.0))],
            Alive::new([sid].into_iter().collect()),
        )
    }

    #[test]
    fn test_envelope_accessors() {
        let bundle = sample_bundle(1, 9);
        assert!(bundle.is_well_formed());
        assert_eq!(bundle.frame().unwrap().frame_id, 1);
        assert!(bundle.alive().unwrap().contains(9));
    }

    #[test]
    fn test_nth_of() {
        let mut bundle = sample_bundle(1, 9);
        bundle.clear();
        bundle.push(Message::Frame(Frame::new(1, Timetag::IMMEDIATE)));
        bundle.push(Message::Pointer(Pointer::new_2d(1, 0, 0, 0, 0.1, 0.1, 0.0, 1.0)));
        bundle.push(Message::Pointer(Pointer::new_2d(2, 0, 0, 0, 0.2, 0.2, 0.0, 1.0)));
        bundle.push(Message::Alive(Alive::new([1, 2].into_iter().collect())));
        assert_eq!(bundle.nth_of::<Pointer>(0).unwrap().session_id, 1);
        assert_eq!(bundle.nth_of::<Pointer>(1).unwrap().session_id, 2);
        assert!(bundle.nth_of::<Pointer>(2).is_none());
    }

    #[test]
    fn test_malformed_handles_detected() {
        let mut bundle = BundleHandle::new();
        bundle.push(Message::Pointer(Pointer::new_2d(1, 0, 0, 0, 0.1, 0.1, 0.0, 1.0)));
        assert!(!bundle.is_well_formed());
    }

    #[test]
    fn test_stack_rejects_empty_handles() {
        let mut stack = BundleStack::new();
        assert!(!stack.append(BundleHandle::new()));
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn test_stack_fifo_order() {
        let mut stack = BundleStack::new();
        stack.append(sample_bundle(1, 1));
        stack.append(sample_bundle(2, 2));
        stack.append(sample_bundle(3, 3));
        assert_eq!(stack.len(), 3);

        let oldest = stack.get_update(StackIndex::Oldest).unwrap();
        assert_eq!(oldest.frame().unwrap().frame_id, 1);
        let newest = stack.get_update(StackIndex::Newest).unwrap();
        assert_eq!(newest.frame().unwrap().frame_id, 3);
        let nth = stack.get_update(StackIndex::Nth(0)).unwrap();
        assert_eq!(nth.frame().unwrap().frame_id, 2);
        assert!(stack.is_empty());
    }
}
