//! Receive-block lowering.
//!
//! `receive { arms }` lowers to:
//!
//! ```text
//!   %msg = call arnm_receive(null)
//!   %tagp = field_ptr %msg, 0        ; tag sits at offset 0
//!   %tag = load i64 %tagp
//!   call arnm_message_free(%msg)
//!   ; equality-branch chain over the arm tags
//!   ; unmatched tags reach the nomatch block: arnm_panic_nomatch()
//! ```
//!
//! Integer-literal patterns compare against their value; identifier
//! patterns compare against DJB2 (seed 5381) of the identifier bytes,
//! truncated to 32 bits then widened. This is the tag protocol the sender
//! side of `!` speaks.

use crate::Lowerer;
use arnm_ir::{ArmRange, Pattern};
use arnm_ssa::{BlockId, IrType, IrValue};
use arnm_ssa::Opcode;

/// DJB2 hash of an identifier, the implicit message tag of a bind pattern.
pub fn pattern_tag(ident: &str) -> u32 {
    let mut hash: u32 = 5381;
    for &b in ident.as_bytes() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(u32::from(b));
    }
    hash
}

impl Lowerer<'_> {
    pub(crate) fn lower_receive(&mut self, arms: ArmRange) {
        let block = self.cur_block;

        // Block until a message arrives, pull the tag, release the carrier.
        let receive = self.runtime("arnm_receive");
        let msg = {
            let mut b = self.fb();
            b.call(block, receive, vec![IrValue::null_ptr()], IrType::Ptr)
        };
        let tag_val = {
            let mut b = self.fb();
            let tag_ptr = b.field_ptr(block, msg, 0);
            b.load(block, IrType::I64, tag_ptr)
        };
        let free = self.runtime("arnm_message_free");
        {
            let mut b = self.fb();
            b.call(block, free, vec![msg], IrType::Void);
        }

        let arms = self.arena.arms(arms).to_vec();
        if arms.is_empty() {
            return;
        }

        let mut arm_blocks: Vec<BlockId> = Vec::with_capacity(arms.len());
        for i in 0..arms.len() {
            let label = format!("recv.arm{i}");
            arm_blocks.push(self.fb().add_block(Some(label.as_str())));
        }
        let merge_bb = self.fb().add_block(Some("recv.merge"));
        let nomatch_bb = self.fb().add_block(Some("recv.nomatch"));

        // Comparison chain: each failed test falls through to the next
        // check, the last to the nomatch block.
        for (i, arm) in arms.iter().enumerate() {
            let expected = match arm.pattern {
                Pattern::Tag(value) => IrValue::const_i64(value),
                Pattern::Bind(name) => {
                    let text = self.interner.lookup(name);
                    IrValue::const_i64(i64::from(pattern_tag(text)))
                }
            };

            let check = self.cur_block;
            let cmp = self.fb().compare(check, Opcode::Eq, tag_val, expected);
            let next_check = if i + 1 < arms.len() {
                self.fb().add_block(Some("recv.check"))
            } else {
                nomatch_bb
            };
            self.fb().br(check, cmp, arm_blocks[i], next_check);
            self.cur_block = next_check;
        }

        // Unmatched message: abort with a diagnostic.
        self.cur_block = nomatch_bb;
        let panic_fn = self.runtime("arnm_panic_nomatch");
        self.fb()
            .call(nomatch_bb, panic_fn, Vec::new(), IrType::Void);
        self.fb().jmp(nomatch_bb, merge_bb);

        // Arm bodies. Bind patterns get a slot holding the tag value.
        for (i, arm) in arms.iter().enumerate() {
            self.cur_block = arm_blocks[i];
            let mark = self.locals.len();

            if let Pattern::Bind(name) = arm.pattern {
                let block = self.cur_block;
                let slot = {
                    let mut b = self.fb();
                    let slot = b.alloca(block, IrType::I64);
                    b.store(block, tag_val, slot);
                    slot
                };
                self.add_local(name, slot, IrType::I64);
            }

            self.lower_block(arm.body);
            if !self.is_terminated() {
                let block = self.cur_block;
                self.fb().jmp(block, merge_bb);
            }
            self.locals.truncate(mark);
        }

        self.cur_block = merge_bb;
    }
}

#[cfg(test)]
mod tests {
    use super::pattern_tag;

    #[test]
    fn djb2_reference_values() {
        // djb2("") is the seed itself.
        assert_eq!(pattern_tag(""), 5381);
        // djb2("a") = 5381 * 33 + 'a'
        assert_eq!(pattern_tag("a"), 5381 * 33 + u32::from(b'a'));
        // Hand-computed two-step value.
        let expected = (5381u32.wrapping_mul(33).wrapping_add(u32::from(b'h')))
            .wrapping_mul(33)
            .wrapping_add(u32::from(b'i'));
        assert_eq!(pattern_tag("hi"), expected);
    }

    #[test]
    fn distinct_idents_usually_distinct_tags() {
        assert_ne!(pattern_tag("incr"), pattern_tag("decr"));
        assert_ne!(pattern_tag("ping"), pattern_tag("pong"));
    }
}
