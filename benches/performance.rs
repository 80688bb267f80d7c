use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

use ledger_core::models::journal_entry::balanced_totals;
use ledger_core::models::note::note_totals;
use ledger_core::models::{DocumentType, JournalLineInput, NoteItemInput};

fn journal_lines(size: usize) -> Vec<JournalLineInput> {
    let accounts: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
    let mut lines = Vec::with_capacity(size * 2);
    for i in 0..size {
        let amount = Decimal::new((i % 1000) as i64 * 100 + 199, 2);
        lines.push(JournalLineInput::debit(accounts[i % accounts.len()], amount));
        lines.push(JournalLineInput::credit(accounts[(i + 1) % accounts.len()], amount));
    }
    lines
}

fn benchmark_journal_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("journal");
    group.measurement_time(Duration::from_secs(10));

    for size in [2, 50, 1000].iter() {
        let lines = journal_lines(*size);
        group.bench_with_input(BenchmarkId::new("balanced_totals", size), &lines, |b, lines| {
            b.iter(|| black_box(balanced_totals(black_box(lines))))
        });
    }

    group.finish();
}

fn benchmark_note_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("notes");

    for size in [1, 20, 500].iter() {
        let items: Vec<NoteItemInput> = (0..*size)
            .map(|i| {
                NoteItemInput::new(
                    Uuid::new_v4(),
                    Decimal::new(i as i64 % 7 + 1, 0),
                    Decimal::new(i as i64 * 37 + 5, 2),
                )
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("note_totals", size), &items, |b, items| {
            b.iter(|| black_box(note_totals(black_box(items))))
        });
    }

    group.finish();
}

fn benchmark_document_numbers(c: &mut Criterion) {
    let mut group = c.benchmark_group("numbering");

    group.bench_function("format_number", |b| {
        b.iter(|| black_box(DocumentType::JournalEntry.format_number(black_box(123_456))))
    });

    group.bench_function("parse_sequence", |b| {
        b.iter(|| black_box(DocumentType::CreditNote.parse_sequence(black_box("CN-004211"))))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_journal_validation,
    benchmark_note_totals,
    benchmark_document_numbers
);
criterion_main!(benches);
