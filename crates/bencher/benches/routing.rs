use bencher::{TableShape, TestCase};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use micro_rpc::route::{get, ParamSpec, RouteDefinition, RouteTable};
use micro_rpc::{handler_fn, CallRequest, Dispatcher, DispatchConfig, ParamType, Task};
use serde_json::{json, Value};
use std::hint::black_box;
use std::sync::Arc;

static SMALL: TableShape = TableShape::new(10, 1);
static NORMAL: TableShape = TableShape::new(100, 3);
static LARGE: TableShape = TableShape::new(1000, 5);

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("small_table", SMALL),
        TestCase::normal("normal_table", NORMAL),
        TestCase::large("large_table", LARGE),
    ]
}

fn version(index: usize) -> String {
    format!("{}_01_01", 2020 + index)
}

fn get_order(id: i64, line: i32, expand: bool) -> Value {
    json!({ "id": id, "line": line, "expand": expand })
}

fn definitions(shape: &TableShape) -> Vec<RouteDefinition> {
    let mut definitions = Vec::with_capacity(shape.route_count());
    for resource in 0..shape.resources() {
        for v in 0..shape.versions() {
            let suffix = version(v);
            definitions.push(get(format!("list_r{resource}_{suffix}"), format!("/r{resource}"), handler_fn(|| "list")));
            definitions.push(
                get(format!("get_r{resource}_{suffix}"), format!("/r{resource}/:id"), handler_fn(|id: i64| id))
                    .param(ParamSpec::path("id", ParamType::Long)),
            );
            definitions.push(
                get(
                    format!("line_r{resource}_{suffix}"),
                    format!("/r{resource}/:id/lines/:line"),
                    handler_fn(get_order),
                )
                    .param(ParamSpec::path("id", ParamType::Long))
                    .param(ParamSpec::path("line", ParamType::Int))
                    .param(ParamSpec::query("expand", ParamType::Bool).default_value(false)),
            );
        }
    }
    definitions
}

fn table(shape: &TableShape) -> RouteTable {
    RouteTable::builder().routes(definitions(shape)).build().expect("generated routes should be valid")
}

fn benchmark_route_match(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("route_match");

    for case in create_test_cases() {
        let table = table(case.shape());
        let last = case.shape().resources() - 1;
        let path = format!("/r{last}/42/lines/7?expand=true");

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &path, |b, path| {
            b.iter(|| {
                let matched = table.router().at(&http::Method::GET, black_box(path), 20_210_601);
                black_box(matched.map(|m| m.captures().len()));
            });
        });
    }

    group.finish();
}

fn benchmark_table_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("table_build");

    for case in create_test_cases() {
        group.throughput(Throughput::Elements(case.shape().route_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), case.shape(), |b, shape| {
            b.iter_batched(
                || definitions(shape),
                |d| black_box(RouteTable::builder().routes(d).build()),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn benchmark_dispatch(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("dispatch");

    for case in create_test_cases() {
        let dispatcher =
            Dispatcher::new(Arc::new(table(case.shape())), Arc::new(Silent), DispatchConfig::default());
        let last = case.shape().resources() - 1;
        let path = format!("/r{last}/42/lines/7?expand=true");

        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &path, |b, path| {
            b.iter(|| {
                let task: Task<Value> = dispatcher.dispatch(CallRequest::get(path.as_str()));
                black_box(futures::executor::block_on(task))
            });
        });
    }

    group.finish();
}

/// Listener without output, so the benchmark measures dispatch only.
struct Silent;

impl micro_rpc::CallListener for Silent {
    fn on_start(&self, _call: &micro_rpc::RouteContext) -> u64 {
        0
    }

    fn on_succeed(&self, _call: &micro_rpc::RouteContext, _result: &Value) {}

    fn on_fail(&self, _call: &micro_rpc::RouteContext, _error: &micro_rpc::RpcError) {}
}

criterion_group!(routing, benchmark_route_match, benchmark_table_build, benchmark_dispatch);
criterion_main!(routing);
