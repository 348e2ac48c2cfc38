//! Parser benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sandjs::Parser;

const FIXTURE: &str = r#"
function quicksort(arr) {
  if (arr.length <= 1) { return arr; }
  var pivot = arr[0];
  var left = [], right = [];
  for (var i = 1; i < arr.length; i++) {
    if (arr[i] < pivot) { left.push(arr[i]); } else { right.push(arr[i]); }
  }
  return quicksort(left).concat([pivot], quicksort(right));
}

var data = [];
for (var i = 0; i < 100; i++) {
  data.push((i * 7919) % 251);
}
var sorted = quicksort(data);
var report = {
  count: sorted.length,
  first: sorted[0],
  last: sorted[sorted.length - 1]
};
JSON.stringify(report);
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_quicksort", |b| {
        b.iter(|| {
            let mut parser = Parser::new(black_box(FIXTURE)).unwrap();
            parser.parse_program().unwrap()
        })
    });
}

fn bench_parse_expressions(c: &mut Criterion) {
    let source = "1 + 2 * 3 - 4 / 5 % 6 << 7 >> 8 & 9 | 10 ^ 11;".repeat(50);
    c.bench_function("parse_operators", |b| {
        b.iter(|| {
            let mut parser = Parser::new(black_box(source.as_str())).unwrap();
            parser.parse_program().unwrap()
        })
    });
}

criterion_group!(benches, bench_parse, bench_parse_expressions);
criterion_main!(benches);
