#![cfg(not(feature = "loom"))]

use std::collections::VecDeque;

use cbuf::{Config, Index, ResultCode, RingBuffer};
use quickcheck::{Arbitrary, Gen, QuickCheck};
use rstest::rstest;

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Pop,
    PopInto(usize),
    Peek(usize, bool),
    Clear,
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut Gen) -> Self {
        match u8::arbitrary(g) % 10 {
            0..=3 => Op::Push(u8::arbitrary(g)),
            4 | 5 => Op::Pop,
            6 => Op::PopInto(usize::arbitrary(g) % 8),
            7 | 8 => Op::Peek(usize::arbitrary(g) % 8, bool::arbitrary(g)),
            _ => Op::Clear,
        }
    }
}

/// Replays `ops` against the ring buffer and a `VecDeque` bounded to the same capacity.
fn matches_model<I: Index>(capacity: usize, ops: &[Op]) -> bool {
    let mut rb = RingBuffer::<u8, I>::with_config(Config::new(capacity)).unwrap();
    let mut model = VecDeque::with_capacity(capacity);

    for op in ops {
        match *op {
            Op::Push(b) => {
                let pushed = rb.push(b);
                if model.len() == capacity {
                    if pushed != Err(ResultCode::Overflow) {
                        return false;
                    }
                } else {
                    model.push_back(b);
                    if pushed.is_err() {
                        return false;
                    }
                }
            }
            Op::Pop => {
                if rb.pop_one() != model.pop_front() {
                    return false;
                }
            }
            Op::PopInto(n) => {
                let mut dst = vec![0u8; n];
                let got = rb.pop_into(&mut dst);
                let want: Vec<u8> = model.drain(..n.min(model.len())).collect();
                if dst[..got] != want[..] {
                    return false;
                }
            }
            Op::Peek(k, commit) => {
                let mut shadow = rb.begin_read();
                let seen: Vec<u8> = (0..k).map_while(|_| shadow.peek_one()).collect();
                let want: Vec<u8> = model.iter().take(k).copied().collect();
                if seen != want {
                    return false;
                }
                if commit {
                    shadow.commit();
                    model.drain(..seen.len());
                } else {
                    shadow.reset();
                }
            }
            Op::Clear => {
                rb.clear();
                model.clear();
            }
        }

        if rb.len() != model.len()
            || rb.overflow() != (model.len() == capacity)
            || rb.index() >= capacity
            || rb.start() >= capacity
        {
            return false;
        }
    }
    true
}

#[test]
fn ring_buffer_matches_vecdeque_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(capacity: u8, ops: Vec<Op>) -> bool {
        let capacity = usize::from(capacity % 9) + 1;
        matches_model::<u8>(capacity, &ops)
    }

    QuickCheck::new()
        .tests(500)
        .quickcheck(prop as fn(u8, Vec<Op>) -> bool);
}

#[rstest]
#[case::one_slot(1)]
#[case::two_slots(2)]
#[case::odd(5)]
#[case::u8_limit(256)]
fn fill_drain_cycles_u8(#[case] capacity: usize) {
    let ops = cycle_ops(capacity);
    assert!(matches_model::<u8>(capacity, &ops));
}

#[rstest]
#[case::u16(300)]
#[case::u32(1000)]
fn fill_drain_cycles_wide(#[case] capacity: usize) {
    let ops = cycle_ops(capacity);
    assert!(matches_model::<u16>(capacity, &ops));
    assert!(matches_model::<u32>(capacity, &ops));
    assert!(matches_model::<usize>(capacity, &ops));
}

/// Fill past capacity, drain half through a committed peek, repeat.
fn cycle_ops(capacity: usize) -> Vec<Op> {
    let mut ops = Vec::new();
    for round in 0..3u8 {
        for i in 0..=capacity {
            ops.push(Op::Push(round ^ i as u8));
        }
        ops.push(Op::Peek(capacity / 2, true));
        ops.push(Op::Peek(capacity, false));
        ops.push(Op::Pop);
    }
    ops.push(Op::Clear);
    ops
}
