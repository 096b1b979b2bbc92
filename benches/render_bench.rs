//! Template rendering benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Map, Value};
use slotkit::*;

fn catalog_bundle(product_count: usize) -> PageBundle {
    let products: Vec<Value> = (0..product_count)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Product {}", i),
                "price": 10.0 + i as f64,
                "compare_price": if i % 3 == 0 { json!(20.0 + i as f64) } else { Value::Null },
                "stock_quantity": i % 7,
                "is_new": i % 5 == 0
            })
        })
        .collect();

    serde_json::from_value(json!({
        "page_type": "category",
        "store": { "slug": "bench", "name": "Bench Store" },
        "settings": {
            "ui_translations": { "en": { "add_to_cart": "Add to cart" } },
            "product_labels": [{ "type": "new", "text": "New" }, { "type": "sale", "text": "Sale" }]
        },
        "data": { "products": products }
    }))
    .unwrap()
}

const PRODUCT_GRID: &str = r#"
<h2>{{category.name}}</h2><p>{{product_count_text}}</p>
<ul>
{{#each products}}
  <li class="{{#if @first}}first{{/if}}">
    <a href="{{url}}">{{name}}</a> {{price_formatted}}
    {{#if compare_price}}<s>{{compare_price_formatted}}</s>{{/if}}
    {{#unless in_stock}}<em>sold out</em>{{else}}<button>{{t 'add_to_cart'}}</button>{{/unless}}
    {{#each labels}}<span>{{text}}</span>{{/each}}
  </li>
{{/each}}
</ul>
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_product_grid", |b| {
        b.iter(|| Template::parse(black_box(PRODUCT_GRID)))
    });
}

fn bench_static_text(c: &mut Criterion) {
    let interpreter = Interpreter::from_settings(&Settings::default(), &Store::default(), Locale::default(), None);
    let ctx = VariableContext::from_layers(Map::new(), Map::new());
    let text = "<div class=\"hero\">No directives in here at all</div>".repeat(50);

    c.bench_function("render_static_text", |b| {
        b.iter(|| interpreter.render(black_box(&text), &ctx))
    });
}

fn bench_render_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_page");

    for count in [10usize, 100, 1000] {
        let bundle = catalog_bundle(count);
        let options = BuildOptions::default();
        group.bench_with_input(format!("{}_products", count), &bundle, |b, bundle| {
            b.iter(|| render_page(black_box(PRODUCT_GRID), bundle, &options))
        });
    }

    group.finish();
}

fn bench_prepared_context(c: &mut Criterion) {
    let bundle = catalog_bundle(100);
    let options = BuildOptions::default();
    let ctx = build_context(&bundle, &options);
    let template = Template::parse(PRODUCT_GRID);
    let interpreter = Interpreter::from_settings(&bundle.settings, &bundle.store, Locale::default(), None);

    c.bench_function("render_prepared_100", |b| {
        b.iter(|| interpreter.render_template(black_box(&template), &ctx))
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_static_text,
    bench_render_page,
    bench_prepared_context
);

criterion_main!(benches);
