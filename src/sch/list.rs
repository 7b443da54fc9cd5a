//! Heapless doubly linked list of pending BODs, kept in ascending due order
//!
//! The BODs are stored in a fixed pool of slots owned by the list. Links between the slots are
//! pool indexes, so no BOD is ever referenced from outside of the list while it is pending.
//!
//! A BOD added to the list is represented by a [`BodHandle`]. Like a cloakroom ticket, the handle
//! identifies the BOD in later calls. Each slot carries a generation counter bumped whenever the
//! slot is released, so a handle of a BOD which already left the list does not match any BOD.

use crate::bod::Bod;
use crate::clock;
use crate::config::MAX_BODS;

type Index = u8;

/// Token representing a BOD stored in the scheduler
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BodHandle {
    index: Index,
    generation: u16,
}

struct Slot {
    bod: Option<Bod>,
    generation: u16,
    linked: bool,
    prev: Option<Index>,
    next: Option<Index>,
}

impl Slot {
    const EMPTY: Slot = Slot {
        bod: None,
        generation: 0,
        linked: false,
        prev: None,
        next: None,
    };
}

/// Fixed capacity queue of slot indexes
///
/// Used to keep track of allocated, but unlinked slots while a list operation is in progress.
pub(crate) struct IndexQueue {
    items: [Index; MAX_BODS],
    head: usize,
    len: usize,
}

impl IndexQueue {
    pub(crate) const fn new() -> Self {
        Self {
            items: [0; MAX_BODS],
            head: 0,
            len: 0,
        }
    }

    pub(crate) fn push(&mut self, index: Index) {
        debug_assert!(self.len < MAX_BODS);
        self.items[(self.head + self.len) % MAX_BODS] = index;
        self.len += 1;
    }

    pub(crate) fn pop(&mut self) -> Option<Index> {
        if self.len == 0 {
            return None;
        }

        let index = self.items[self.head];
        self.head = (self.head + 1) % MAX_BODS;
        self.len -= 1;
        Some(index)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Pool of BODs with the list of pending ones
pub struct BodList {
    slots: [Slot; MAX_BODS],
    first: Option<Index>,
    last: Option<Index>,
    len: usize,
}

impl BodList {
    /// Creates a list with all slots free
    pub const fn new() -> Self {
        Self {
            slots: [Slot::EMPTY; MAX_BODS],
            first: None,
            last: None,
            len: 0,
        }
    }

    /// Number of BODs linked in the list
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks if no BOD is linked in the list
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `bod` in a free slot without linking it
    ///
    /// If all slots are in use the ownership of `bod` is returned to the caller.
    pub(crate) fn allocate(&mut self, bod: Bod) -> Result<Index, Bod> {
        match self.slots.iter().position(|slot| slot.bod.is_none()) {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.bod = Some(bod);
                slot.linked = false;
                slot.prev = None;
                slot.next = None;
                Ok(index as Index)
            }
            None => Err(bod),
        }
    }

    /// Takes the BOD out of an unlinked slot and releases the slot
    pub(crate) fn release(&mut self, index: Index) -> Option<Bod> {
        let slot = &mut self.slots[index as usize];
        debug_assert!(!slot.linked);

        let bod = slot.bod.take();
        if bod.is_some() {
            slot.generation = slot.generation.wrapping_add(1);
        }
        bod
    }

    /// Handle of the BOD stored in the slot
    pub(crate) fn handle(&self, index: Index) -> BodHandle {
        BodHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Slot index of the linked BOD represented by `handle`
    pub(crate) fn find(&self, handle: BodHandle) -> Option<Index> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.linked && slot.generation == handle.generation {
            Some(handle.index)
        } else {
            None
        }
    }

    pub(crate) fn bod(&self, index: Index) -> &Bod {
        match &self.slots[index as usize].bod {
            Some(bod) => bod,
            None => panic!("Slot {} does not store a BOD", index),
        }
    }

    pub(crate) fn bod_mut(&mut self, index: Index) -> &mut Bod {
        match &mut self.slots[index as usize].bod {
            Some(bod) => bod,
            None => panic!("Slot {} does not store a BOD", index),
        }
    }

    /// Reference to the pending BOD represented by `handle`
    pub fn get(&self, handle: BodHandle) -> Option<&Bod> {
        self.find(handle).map(|index| self.bod(index))
    }

    /// Links an allocated slot keeping the ascending due order
    ///
    /// A BOD due at the same time as already linked ones is linked behind them.
    pub(crate) fn link(&mut self, index: Index) {
        debug_assert!(!self.slots[index as usize].linked);

        let due = self.bod(index).due;
        let mut following = self.first;
        while let Some(curr) = following {
            if clock::is_before(due, self.bod(curr).due) {
                break;
            }
            following = self.slots[curr as usize].next;
        }

        let preceding = match following {
            Some(curr) => self.slots[curr as usize].prev,
            None => self.last,
        };

        {
            let slot = &mut self.slots[index as usize];
            slot.prev = preceding;
            slot.next = following;
            slot.linked = true;
        }

        match preceding {
            Some(prev) => self.slots[prev as usize].next = Some(index),
            None => self.first = Some(index),
        }
        match following {
            Some(next) => self.slots[next as usize].prev = Some(index),
            None => self.last = Some(index),
        }

        self.len += 1;
    }

    /// Unlinks a slot keeping the BOD allocated
    pub(crate) fn unlink(&mut self, index: Index) {
        let (prev, next) = {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.linked);
            slot.linked = false;
            (slot.prev.take(), slot.next.take())
        };

        match prev {
            Some(prev) => self.slots[prev as usize].next = next,
            None => self.first = next,
        }
        match next {
            Some(next) => self.slots[next as usize].prev = prev,
            None => self.last = prev,
        }

        self.len -= 1;
    }

    /// Removes the pending BOD represented by `handle`
    ///
    /// Returns `None` if the BOD is not pending anymore.
    pub fn remove(&mut self, handle: BodHandle) -> Option<Bod> {
        let index = self.find(handle)?;
        self.unlink(index);
        self.release(index)
    }

    /// Removes the BOD with the earliest due time
    pub fn pop_first(&mut self) -> Option<(BodHandle, Bod)> {
        let index = self.first?;
        let handle = self.handle(index);
        self.unlink(index);
        self.release(index).map(|bod| (handle, bod))
    }

    /// BOD with the earliest due time
    pub fn first(&self) -> Option<&Bod> {
        self.first.map(|index| self.bod(index))
    }

    /// BOD with the latest due time
    pub fn last(&self) -> Option<&Bod> {
        self.last.map(|index| self.bod(index))
    }

    pub(crate) fn first_index(&self) -> Option<Index> {
        self.first
    }

    pub(crate) fn next_index(&self, index: Index) -> Option<Index> {
        self.slots[index as usize].next
    }

    /// Iterates over pending BODs in ascending due order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            next: self.first,
        }
    }
}

impl Default for BodList {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over pending BODs and their handles
pub struct Iter<'list> {
    list: &'list BodList,
    next: Option<Index>,
}

impl<'list> Iterator for Iter<'list> {
    type Item = (BodHandle, &'list Bod);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        self.next = self.list.next_index(index);
        Some((self.list.handle(index), self.list.bod(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bod::protocol::ProtocolData;
    use crate::clock::Ticks;

    fn bod(due: Ticks) -> Bod {
        Bod::new(due, ProtocolData::None, &())
    }

    fn insert(list: &mut BodList, due: Ticks) -> BodHandle {
        let index = list.allocate(bod(due)).unwrap();
        list.link(index);
        list.handle(index)
    }

    fn dues(list: &BodList) -> Vec<Ticks> {
        list.iter().map(|(_, bod)| bod.due).collect()
    }

    #[test]
    fn test_link_keeps_ascending_order() {
        let mut list = BodList::new();

        insert(&mut list, 300);
        insert(&mut list, 100);
        insert(&mut list, 200);
        insert(&mut list, 400);

        assert_eq!(dues(&list), vec![100, 200, 300, 400]);
        assert_eq!(list.len(), 4);
        assert_eq!(list.first().unwrap().due, 100);
        assert_eq!(list.last().unwrap().due, 400);
    }

    #[test]
    fn test_link_across_wraparound() {
        let mut list = BodList::new();

        insert(&mut list, 0x10);
        insert(&mut list, 0xffff_fff0);
        insert(&mut list, 0);

        assert_eq!(dues(&list), vec![0xffff_fff0, 0, 0x10]);
    }

    #[test]
    fn test_equal_due_linked_behind() {
        let mut list = BodList::new();

        let first = insert(&mut list, 100);
        let second = insert(&mut list, 100);

        let handles: Vec<BodHandle> = list.iter().map(|(handle, _)| handle).collect();
        assert_eq!(handles, vec![first, second]);
    }

    #[test]
    fn test_remove_head_middle_and_tail() {
        let mut list = BodList::new();
        let head = insert(&mut list, 100);
        let middle = insert(&mut list, 200);
        let tail = insert(&mut list, 300);
        insert(&mut list, 400);

        assert_eq!(list.remove(middle).unwrap().due, 200);
        assert_eq!(dues(&list), vec![100, 300, 400]);

        assert_eq!(list.remove(head).unwrap().due, 100);
        assert_eq!(dues(&list), vec![300, 400]);

        let last = list.iter().last().unwrap().0;
        assert_eq!(list.remove(last).unwrap().due, 400);
        assert_eq!(dues(&list), vec![300]);
        assert_eq!(list.last().unwrap().due, 300);

        assert_eq!(list.remove(tail).unwrap().due, 300);
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert!(list.last().is_none());
    }

    #[test]
    fn test_stale_handle_not_found() {
        let mut list = BodList::new();
        let handle = insert(&mut list, 100);

        assert!(list.remove(handle).is_some());
        assert!(list.remove(handle).is_none());

        // The slot is reused, but the old handle does not match the new BOD
        let new_handle = insert(&mut list, 200);
        assert_ne!(handle, new_handle);
        assert!(list.get(handle).is_none());
        assert_eq!(list.get(new_handle).unwrap().due, 200);
    }

    #[test]
    fn test_pop_first() {
        let mut list = BodList::new();
        insert(&mut list, 200);
        let first = insert(&mut list, 100);

        let (handle, bod) = list.pop_first().unwrap();
        assert_eq!(handle, first);
        assert_eq!(bod.due, 100);

        assert_eq!(list.pop_first().unwrap().1.due, 200);
        assert!(list.pop_first().is_none());
    }

    #[test]
    fn test_allocate_more_bods_than_available() {
        let mut list = BodList::new();
        for i in 0..MAX_BODS {
            insert(&mut list, i as Ticks);
        }

        let result = list.allocate(bod(1000));
        assert_eq!(result.err().unwrap().due, 1000);
    }

    #[test]
    fn test_sorted_after_random_inserts_and_removes() {
        let mut list = BodList::new();
        let mut handles = Vec::new();
        let mut seed = 0x1234_5678u32;

        for _ in 0..500 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            if list.len() < MAX_BODS && seed & 0x100 != 0 {
                handles.push(insert(&mut list, seed >> 12));
            } else if !handles.is_empty() {
                let handle = handles.swap_remove(seed as usize % handles.len());
                assert!(list.remove(handle).is_some());
            }

            let dues = dues(&list);
            for pair in dues.windows(2) {
                assert!(!clock::is_before(pair[1], pair[0]));
            }
            assert_eq!(dues.len(), list.len());
        }
    }

    #[test]
    fn test_index_queue_fifo() {
        let mut queue = IndexQueue::new();
        assert!(queue.is_empty());

        for i in 0..MAX_BODS {
            queue.push(i as Index);
        }
        for i in 0..MAX_BODS {
            assert_eq!(queue.pop(), Some(i as Index));
        }
        assert_eq!(queue.pop(), None);

        queue.push(3);
        queue.push(4);
        assert_eq!(queue.pop(), Some(3));
        queue.push(5);
        assert_eq!(queue.pop(), Some(4));
        assert_eq!(queue.pop(), Some(5));
    }
}
