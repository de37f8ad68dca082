// ABOUTME: Benchmark suite for the modem receive path
// ABOUTME: Measures chunk normalization, listing walks, and concatenation merging

use at_sms::framer;
use at_sms::responses::walk_pdu_listing;
use at_sms::{ConcatInfo, ConcatPart, MessageStatus, PduType, Reassembler, SmsMessage};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_listing(entries: usize) -> String {
    let mut listing = String::new();
    for index in 0..entries {
        listing.push_str(&format!(
            "+CMGL: {index},1,,24\n07911234567890F1000B819012345678F{:X}\n\n",
            index % 16
        ));
    }
    listing.push_str("OK\n");
    listing
}

fn fragment(index: u32, sequence: u8, total: u8) -> SmsMessage {
    SmsMessage {
        index,
        status: MessageStatus::ReceivedRead,
        kind: PduType::SmsDeliver,
        from: Some("+8190000000000".into()),
        to: None,
        date: Some("2024-05-01T09:30:00+09:00".into()),
        concat: Some(ConcatInfo {
            reference: 17,
            total,
            part: ConcatPart::Fragment { sequence },
        }),
        text: "fragment text ".into(),
    }
}

fn bench_normalize(c: &mut Criterion) {
    let chunk = b"\r\n+CMGL: 1,1,,24\r\n07911234567890F1\r\n\r\n+CMGL: 2,1,,24\r\n07911234567890F2\r\n\r\nOK\r\n";
    c.bench_function("normalize_chunk", |b| {
        b.iter(|| framer::normalize(black_box(chunk)))
    });
}

fn bench_listing_walk(c: &mut Criterion) {
    let listing = sample_listing(20);
    c.bench_function("walk_pdu_listing_20", |b| {
        b.iter(|| walk_pdu_listing(black_box(&listing)).unwrap())
    });
}

fn bench_reassembly(c: &mut Criterion) {
    c.bench_function("merge_list_8x4_fragments", |b| {
        b.iter_batched(
            || {
                let mut messages = Vec::new();
                for group in 0..8u32 {
                    for sequence in (1..=4u8).rev() {
                        let mut message = fragment(group * 4 + sequence as u32, sequence, 4);
                        if let Some(concat) = &mut message.concat {
                            concat.reference = group as u16;
                        }
                        messages.push(message);
                    }
                }
                messages
            },
            |messages| Reassembler::merge_list(black_box(messages)),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_normalize, bench_listing_walk, bench_reassembly);
criterion_main!(benches);
