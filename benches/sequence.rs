use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use memdb::app::services::memdb::sequence::{Postings, SetIntersection, union_sets};
use memdb::{Coords, LevTr, Level, Memdb, Query, Station, Trange, Var, Varcode};
use std::hint::black_box;

/// Every `step`-th slot id below `len`
fn postings(len: usize, step: usize) -> Postings {
    (0..len).step_by(step).collect()
}

fn bench_intersection(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersection");
    for len in [1_000, 100_000] {
        let sparse = postings(len, 97);
        let medium = postings(len, 7);
        let dense = postings(len, 2);
        group.bench_with_input(BenchmarkId::new("three_sets", len), &len, |b, _| {
            b.iter(|| {
                let mut sets = SetIntersection::new();
                sets.add(&dense);
                sets.add(&medium);
                sets.add(&sparse);
                black_box(sets.iter().count())
            })
        });
    }
    group.finish();
}

fn bench_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("union");
    for sets in [2, 16, 128] {
        let postings: Vec<Postings> = (0..sets)
            .map(|offset| (offset..50_000).step_by(sets).collect())
            .collect();
        group.bench_with_input(BenchmarkId::new("disjoint", sets), &sets, |b, _| {
            b.iter(|| black_box(union_sets(postings.iter()).count()))
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let temperature = Varcode::new(0, 12, 101);
    let levtr = LevTr::new(Level::single(1, None), Trange::instant());
    let mut db = Memdb::default();
    for i in 0..200 {
        let lat = 35.0 + (i % 20) as f64;
        let lon = 5.0 + (i / 20) as f64;
        let station = Station::fixed(Coords::from_degrees(lat, lon).unwrap(), "synop");
        for hour in 0..24 {
            let datetime = NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap();
            db.insert_data(
                &station,
                &levtr,
                datetime,
                vec![Var::int(temperature, 27_000 + hour as i32 * 10)],
                false,
                true,
            )
            .unwrap();
        }
    }

    let query = Query {
        latmin: Some(40.0),
        latmax: Some(45.0),
        lonmin: Some(6.0),
        lonmax: Some(9.0),
        datafilter: Some("B12101>=272.00".to_string()),
        ..Query::new()
    };
    c.bench_function("query_data_box", |b| {
        b.iter(|| black_box(db.query_data(&query).unwrap().len()))
    });
}

criterion_group!(benches, bench_intersection, bench_union, bench_query);
criterion_main!(benches);
