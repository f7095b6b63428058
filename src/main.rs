use maggrid::image::{GrayImageU8, InMemoryPixelSource};
use maggrid::metadata::{DetectorMode, RawMetadata};
use maggrid::types::ImageId;
use maggrid::{BuilderParams, GridComposer, HierarchyBuilder, RenderConfig, SourceRecord};

fn record(mag: f64, fov: f64, x: f64, y: f64) -> RawMetadata {
    RawMetadata {
        mode: Some(DetectorMode::Sed),
        high_voltage_kv: Some(15.0),
        intensity: Some(5.0),
        magnification: Some(mag),
        field_of_view_width: Some(fov),
        field_of_view_height: Some(fov),
        position_x: Some(x),
        position_y: Some(y),
        acquired_at: None,
    }
}

fn main() {
    // Demo stub: a synthetic three-level chain (100× → 500× → 2000×) with
    // flat gray buffers, built and composed end to end.
    let records = vec![
        SourceRecord {
            image: ImageId::from("overview.tif"),
            metadata: record(100.0, 1000.0, 0.0, 0.0),
        },
        SourceRecord {
            image: ImageId::from("detail.tif"),
            metadata: record(500.0, 200.0, 120.0, -60.0),
        },
        SourceRecord {
            image: ImageId::from("closeup.tif"),
            metadata: record(2000.0, 50.0, 130.0, -55.0),
        },
    ];

    let mut pixels = InMemoryPixelSource::new();
    for source in &records {
        pixels.insert(
            source.image.clone(),
            GrayImageU8::new(256, 256, vec![128; 256 * 256]),
        );
    }

    let builder = HierarchyBuilder::new(BuilderParams::default());
    let forest = match builder.build(&records, Some(&pixels)) {
        Ok(forest) => forest,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    println!(
        "forest: {} node(s), {} edge(s), {} root(s)",
        forest.len(),
        forest.edges().len(),
        forest.roots().len()
    );

    let composer = GridComposer::new(RenderConfig::default());
    for &root in forest.roots() {
        let selection = forest.tree_of(root);
        if selection.len() < 2 {
            continue;
        }
        match composer.compose(&forest, &selection, &pixels) {
            Ok(plan) => match serde_json::to_string_pretty(&plan) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("Error: failed to serialize plan: {err}"),
            },
            Err(err) => eprintln!("Error: {err}"),
        }
    }
}
