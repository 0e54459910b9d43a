// Local modules
mod base;
mod bbox;
mod bsdf;
mod buffer;
mod bvh;
mod camera;
mod color;
mod integrator;
mod light;
mod matrix;
mod point;
mod primitive;
mod progress;
mod ray;
mod render;
mod sampler;
mod scene;
mod utils;
mod vector;

// External/std libraries for main
use clap::{App, Arg};
use image::png::PNGEncoder;
use image::ColorType;
use std::{fs, path, process, sync::Arc, time::Instant};

fn main() {
    let matches = App::new("Raytracer")
        .arg(
            Arg::with_name("thread-count")
                .short("t")
                .long("thread-count")
                .value_name("THREAD_COUNT")
                .help("Number of threads to use while tracing")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("IN_SCENE_FILE")
                .help("The scene specification to render")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUT_FILEPATH")
                .help("The relative filepath to write the output image to")
                .required(true)
                .index(2),
        )
        .get_matches();

    let program_start = Instant::now();

    let num_threads = matches
        .value_of("thread-count")
        .unwrap_or("2")
        .parse::<u32>()
        .expect("thread-count requires a valid positive integer");
    if num_threads == 0_u32 {
        panic!("Need a thread count greater than zero");
    }

    let scene_spec_path = path::Path::new(matches.value_of("IN_SCENE_FILE").unwrap());
    let scene_str = fs::read_to_string(&scene_spec_path).expect("Failed to read scene spec file.");
    let spec_dir = scene_spec_path.parent().unwrap_or_else(|| path::Path::new("/"));

    let scene = match scene::deserialize(&scene_str, spec_dir) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to load scene: {}", e);
            process::exit(1);
        }
    };

    let out_file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(matches.value_of("OUT_FILEPATH").unwrap())
        .expect("Failed to create new file");
    let png_encoder = PNGEncoder::new(out_file);

    let buffer = render::render(&scene, num_threads);

    let data = buffer.to_ldr_bytes();
    match png_encoder.encode(&data, buffer.width(), buffer.height(), ColorType::RGB(8)) {
        Ok(()) => println!(
            "Success! Took {} seconds ({} total samples)",
            program_start.elapsed().as_secs_f64(),
            buffer.total_samples()
        ),
        Err(e) => {
            eprintln!("Failed to encode the png for output: {}", e);
            process::exit(1);
        }
    }
}
