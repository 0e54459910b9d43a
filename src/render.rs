use crate::buffer::SampleBuffer;
use crate::integrator::PathTracer;
use crate::progress::Progress;
use crate::sampler::UniformSampler2D;
use crate::scene::Scene;

use std::sync::{mpsc, Arc, Mutex};
use std::thread;

// Renders `scene` into a freshly allocated buffer, splitting the image into
// rows and handing them out through an mpsc work queue to `num_threads`
// worker threads (the calling thread joins in as one of them) -- the same
// split-work-across-a-channel structure the teacher's single image-wide
// pixel queue used, adapted to hand out whole rows since per-pixel
// adaptive sampling makes some pixels far more expensive than others.
pub fn render(scene: &Arc<Scene>, num_threads: u32) -> SampleBuffer {
    let res_x = scene.logistics.resolution_x;
    let res_y = scene.logistics.resolution_y;

    let buffer = Arc::new(Mutex::new(SampleBuffer::new(res_x, res_y)));

    let (tx, rx) = {
        let (temp_tx, temp_rx) = mpsc::channel();
        (temp_tx, Arc::new(Mutex::new(temp_rx)))
    };

    let progress = Arc::new(Mutex::new(Progress::new(
        res_y as u64,
        Arc::new(Mutex::new(std::io::stdout())),
        20_u32,
    )));

    let mut threads = Vec::new();
    for _ in 0..(num_threads.max(1) - 1_u32) {
        let thread_scene = Arc::clone(scene);
        let thread_rx = Arc::clone(&rx);
        let thread_buffer = Arc::clone(&buffer);
        let thread_progress = Arc::clone(&progress);
        threads.push(thread::spawn(move || {
            row_work(&thread_scene, &thread_rx, &thread_buffer, &thread_progress)
        }));
    }

    for y in 0..res_y {
        tx.send(y)
            .expect("main thread failed to send a row into the render queue");
    }
    drop(tx);

    row_work(scene, &rx, &buffer, &progress);

    for t in threads {
        t.join().expect("failed to join a rendering thread");
    }
    progress.lock().unwrap().done();

    Arc::try_unwrap(buffer)
        .unwrap_or_else(|_| panic!("render buffer still has outstanding references"))
        .into_inner()
        .expect("render buffer mutex was poisoned")
}

fn row_work(
    scene: &Scene,
    rx: &Mutex<mpsc::Receiver<u32>>,
    buffer: &Mutex<SampleBuffer>,
    progress: &Mutex<Progress>,
) {
    let mut tracer = PathTracer::new(
        &scene.bvh,
        &scene.lights,
        &scene.camera,
        scene.logistics.path_tracer.clone(),
    );
    tracer.set_frame_size(scene.logistics.resolution_x, scene.logistics.resolution_y);
    let mut sampler = UniformSampler2D::new();

    loop {
        let y = {
            match rx
                .lock()
                .expect("thread failed to acquire lock on the row queue")
                .iter()
                .next()
            {
                Some(y) => y,
                None => break,
            }
        };

        // Trace the whole row without holding the output buffer's lock;
        // only the final copy into the shared buffer needs it.
        let row: Vec<(crate::color::RGB, u32)> = (0..scene.logistics.resolution_x)
            .map(|x| tracer.raytrace_pixel(x, y, &mut sampler))
            .collect();

        {
            let mut out = buffer
                .lock()
                .expect("thread failed to acquire lock on the output buffer");
            for (x, (spectrum, samples)) in row.into_iter().enumerate() {
                out.set(x as u32, y, spectrum, samples);
            }
        }

        progress.lock().unwrap().update(1);
    }
}
