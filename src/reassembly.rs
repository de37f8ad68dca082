// ABOUTME: Concatenated-SMS reassembly: groups fragments by (type, counterpart, reference, total)
// ABOUTME: Supports bulk list-mode merging and incremental live-mode merging from +CMTI reads

use crate::pdu::PduType;
use crate::session::types::{ConcatInfo, ConcatPart, SmsMessage};
use std::collections::HashMap;

/// Text substituted for fragments that never arrived when a partial bucket
/// is flushed at the end of a listing.
pub const MISSING_FRAGMENT_TEXT: &str = "[?]";

/// Identity of one logical concatenated message.
///
/// The counterpart is the originator for SMS-DELIVER and the recipient for
/// SMS-SUBMIT, so inbound and outbound messages sharing a reference number
/// never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    kind: PduType,
    counterpart: String,
    reference: u16,
    total: u8,
}

#[derive(Debug)]
struct Bucket {
    /// First fragment seen for this key; supplies the merged record's
    /// index, status, addressing, and date
    template: SmsMessage,
    texts: Vec<Option<String>>,
    indexes: Vec<Option<u32>>,
    filled: u8,
}

impl Bucket {
    fn new(template: SmsMessage, total: u8) -> Self {
        Self {
            template,
            texts: vec![None; total as usize],
            indexes: vec![None; total as usize],
            filled: 0,
        }
    }

    /// Store one fragment. A duplicate sequence overwrites its slot in
    /// place without growing the fill count, so a bucket never exceeds
    /// `total` fragments.
    fn store(&mut self, sequence: u8, text: String, index: u32) {
        let slot = (sequence - 1) as usize;
        if self.texts[slot].is_none() {
            self.filled += 1;
        }
        self.texts[slot] = Some(text);
        self.indexes[slot] = Some(index);
    }

    fn is_complete(&self) -> bool {
        self.filled as usize == self.texts.len()
    }

    /// Produce the merged message: texts joined in sequence order, missing
    /// slots replaced by [`MISSING_FRAGMENT_TEXT`], index holes preserved.
    fn finalize(self, reference: u16, total: u8) -> SmsMessage {
        let text: String = self
            .texts
            .iter()
            .map(|slot| slot.as_deref().unwrap_or(MISSING_FRAGMENT_TEXT))
            .collect();
        SmsMessage {
            concat: Some(ConcatInfo {
                reference,
                total,
                part: ConcatPart::Merged {
                    indexes: self.indexes,
                },
            }),
            text,
            ..self.template
        }
    }
}

/// Merges concatenated-SMS fragments into logical messages.
///
/// List mode ([`Reassembler::merge_list`]) consumes a whole listing at once
/// and flushes incomplete buckets with placeholder text. Live mode
/// ([`Reassembler::push`]) feeds one fragment at a time as `+CMTI` reads
/// come in and yields a message only once every fragment has arrived.
#[derive(Debug, Default)]
pub struct Reassembler {
    buckets: HashMap<BucketKey, Bucket>,
}

enum Absorbed {
    /// Not concatenated (or carrying an unusable header): pass through
    Standalone(SmsMessage),
    /// First fragment of a new key; the template placeholder is returned
    /// so list mode can reserve its output position
    First(BucketKey, SmsMessage),
    /// Fragment stored, message still incomplete
    Pending,
    /// This fragment completed the bucket
    Complete(BucketKey, SmsMessage),
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk merge: every complete group collapses into one merged message
    /// at the position of its first-seen fragment; groups still incomplete
    /// at the end of the listing are flushed in place with `[?]`
    /// substitutions.
    pub fn merge_list(messages: Vec<SmsMessage>) -> Vec<SmsMessage> {
        let mut assembler = Self::new();
        let mut output: Vec<SmsMessage> = Vec::new();
        let mut positions: HashMap<BucketKey, usize> = HashMap::new();

        for message in messages {
            match assembler.absorb(message) {
                Absorbed::Standalone(message) => output.push(message),
                Absorbed::First(key, template) => {
                    positions.insert(key, output.len());
                    output.push(template);
                }
                Absorbed::Pending => {}
                Absorbed::Complete(key, merged) => match positions.get(&key) {
                    Some(&slot) => output[slot] = merged,
                    None => output.push(merged),
                },
            }
        }

        for (key, bucket) in assembler.buckets.drain() {
            let merged = bucket.finalize(key.reference, key.total);
            match positions.get(&key) {
                Some(&slot) => output[slot] = merged,
                None => output.push(merged),
            }
        }
        output
    }

    /// Live merge: returns the complete logical message as soon as its last
    /// fragment arrives, `None` while fragments are still outstanding.
    pub fn push(&mut self, message: SmsMessage) -> Option<SmsMessage> {
        match self.absorb(message) {
            Absorbed::Standalone(message) => Some(message),
            Absorbed::Complete(_, merged) => Some(merged),
            Absorbed::First(..) | Absorbed::Pending => None,
        }
    }

    /// Number of incomplete groups currently held.
    pub fn pending(&self) -> usize {
        self.buckets.len()
    }

    fn absorb(&mut self, message: SmsMessage) -> Absorbed {
        let Some(ConcatInfo {
            reference,
            total,
            part: ConcatPart::Fragment { sequence },
        }) = message.concat
        else {
            return Absorbed::Standalone(message);
        };
        // Sequences outside 1..=total cannot be slotted; pass the fragment
        // through unmerged rather than poisoning a bucket.
        if total == 0 || sequence == 0 || sequence > total {
            return Absorbed::Standalone(message);
        }

        let counterpart = message
            .from
            .as_deref()
            .or(message.to.as_deref())
            .unwrap_or_default()
            .to_string();
        let key = BucketKey {
            kind: message.kind,
            counterpart,
            reference,
            total,
        };

        let first = !self.buckets.contains_key(&key);
        let complete = {
            let bucket = self
                .buckets
                .entry(key.clone())
                .or_insert_with(|| Bucket::new(message.clone(), total));
            bucket.store(sequence, message.text.clone(), message.index);
            bucket.is_complete()
        };

        if complete {
            if let Some(bucket) = self.buckets.remove(&key) {
                return Absorbed::Complete(key, bucket.finalize(reference, total));
            }
        }
        if first {
            Absorbed::First(key, message)
        } else {
            Absorbed::Pending
        }
    }
}
