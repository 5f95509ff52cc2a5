extern crate mandeltiles;
extern crate num;
extern crate rand;
extern crate tempfile;

use mandeltiles::assembler::Assembler;
use mandeltiles::pipeline::SENTINEL;
use mandeltiles::{
    make_tiles, render, FrameBuffer, MandelbrotRenderer, PpmFile, RenderConfig, RenderError,
    ResultsQueue, SnapshotSink, Tile, TileRenderer, TileResult,
};
use num::Complex;
use rand::seq::SliceRandom;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn settings(width: usize, height: usize, edge: usize, workers: usize) -> RenderConfig {
    let mut config = RenderConfig::default();
    config.width = width;
    config.height = height;
    config.tile_size = edge;
    config.workers = workers;
    config.iterations = 200;
    config
}

fn mandelbrot(config: &RenderConfig) -> MandelbrotRenderer {
    MandelbrotRenderer::new(config.plane().unwrap(), config.iterations)
}

/// Keeps every snapshot it is handed.
#[derive(Default)]
struct Recorder {
    frames: Vec<Vec<u8>>,
}

impl SnapshotSink for Recorder {
    fn save(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        self.frames.push(frame.as_bytes().to_vec());
        Ok(())
    }
}

/// Paints each tile a color derived from its position, and counts how
/// often each tile was asked for.
struct Counting {
    calls: Vec<AtomicUsize>,
    tiles: Vec<Tile>,
}

impl Counting {
    fn new(tiles: Vec<Tile>) -> Self {
        Counting {
            calls: tiles.iter().map(|_| AtomicUsize::new(0)).collect(),
            tiles,
        }
    }
}

impl TileRenderer for Counting {
    fn render(&self, tile: &Tile) -> Result<Vec<u8>, RenderError> {
        let id = self.tiles.iter().position(|t| t == tile).unwrap();
        self.calls[id].fetch_add(1, Ordering::SeqCst);
        Ok(vec![(id % 250) as u8 + 1; tile.byte_len()])
    }
}

#[test]
fn sixteen_square_with_four_workers() {
    let config = settings(16, 16, 8, 4);
    let renderer = Counting::new(make_tiles(16, 16, 8).unwrap());
    let mut recorder = Recorder::default();
    let report = render(&config, &renderer, &mut recorder).unwrap();

    assert_eq!(report.tiles, 4);
    assert_eq!(report.arrival_order.len(), 4);
    assert_eq!(report.tiles_per_worker.len(), 4);
    assert_eq!(report.snapshots_written, 4);
    assert_eq!(recorder.frames.len(), 4);
    assert!(report.frame.as_bytes().iter().all(|&b| b != 0));
    assert!(renderer
        .calls
        .iter()
        .all(|c| c.load(Ordering::SeqCst) == 1));
}

#[test]
fn every_tile_is_rendered_exactly_once_for_any_pool_size() {
    for &workers in &[1, 2, 3, 7, 16, 40] {
        let config = settings(45, 33, 4, workers);
        let renderer = Counting::new(make_tiles(45, 33, 4).unwrap());
        let report = render(&config, &renderer, Recorder::default()).unwrap();

        assert!(
            renderer.calls.iter().all(|c| c.load(Ordering::SeqCst) == 1),
            "{} workers",
            workers
        );
        let mut arrived = report.arrival_order.clone();
        arrived.sort();
        assert_eq!(arrived, (0..report.tiles).collect::<Vec<_>>());
        assert_eq!(report.tiles_per_worker.iter().sum::<usize>(), report.tiles);
    }
}

#[test]
fn frame_does_not_depend_on_pool_size() {
    let reference = {
        let config = settings(61, 47, 9, 1);
        render(&config, &mandelbrot(&config), Recorder::default())
            .unwrap()
            .frame
    };
    for &workers in &[2, 4, 9] {
        let config = settings(61, 47, 9, workers);
        let report = render(&config, &mandelbrot(&config), Recorder::default()).unwrap();
        assert!(report.frame == reference, "{} workers changed the image", workers);
    }
}

#[test]
fn frame_does_not_depend_on_arrival_order() {
    let config = settings(40, 30, 8, 1);
    let renderer = mandelbrot(&config);
    let tiles = Arc::new(make_tiles(40, 30, 8).unwrap());
    let expected = render(&config, &renderer, Recorder::default()).unwrap().frame;

    let mut rng = rand::thread_rng();
    for _ in 0..5 {
        let mut order: Vec<usize> = (0..tiles.len()).collect();
        order.shuffle(&mut rng);

        let queue = Arc::new(ResultsQueue::new(tiles.len()).unwrap());
        for &id in &order {
            queue.enqueue(TileResult {
                tile_id: id,
                pixels: renderer.render(&tiles[id]).unwrap(),
            })
            .unwrap();
        }
        let frame = FrameBuffer::new(40, 30).unwrap();
        let assembly = Assembler::new(queue, tiles.clone(), frame, Recorder::default(), 1).run();
        assert_eq!(assembly.arrival_order, order);
        assert!(assembly.frame == expected);
    }
}

#[test]
fn single_slot_queue_does_not_deadlock() {
    let mut config = settings(16, 16, 8, 2);
    config.queue_capacity = Some(1);
    let renderer = Counting::new(make_tiles(16, 16, 8).unwrap());
    let report = render(&config, &renderer, Recorder::default()).unwrap();

    assert_eq!(report.tiles, 4);
    let mut arrived = report.arrival_order.clone();
    arrived.sort();
    assert_eq!(arrived, vec![0, 1, 2, 3]);
}

#[test]
fn degenerate_canvas_renders_nothing_but_still_snapshots() {
    let config = settings(0, 0, 8, 3);
    let mut recorder = Recorder::default();
    let report = render(&config, &mandelbrot(&config), &mut recorder).unwrap();

    assert_eq!(report.tiles, 0);
    assert!(report.arrival_order.is_empty());
    assert_eq!(report.tiles_per_worker, vec![0, 0, 0]);
    assert_eq!(report.snapshots_written, 1);
    assert_eq!(recorder.frames, vec![Vec::<u8>::new()]);
}

#[test]
fn failing_tiles_become_sentinels() {
    struct FailsOnOrigin;
    impl TileRenderer for FailsOnOrigin {
        fn render(&self, tile: &Tile) -> Result<Vec<u8>, RenderError> {
            if tile.start_x == 0 && tile.start_y == 0 {
                Err(RenderError::Tile(0, "no".to_string()))
            } else {
                Ok(vec![1; tile.byte_len()])
            }
        }
    }

    let config = settings(8, 8, 4, 2);
    let report = render(&config, &FailsOnOrigin, Recorder::default()).unwrap();
    assert_eq!(report.sentinel_tiles, 1);
    assert!(!report.is_clean());
    assert_eq!(report.frame.pixel(0, 0), SENTINEL);
    assert_eq!(report.frame.pixel(3, 3), SENTINEL);
    assert_eq!(report.frame.pixel(4, 4), [1, 1, 1]);
}

#[test]
fn failing_snapshots_do_not_stop_the_render() {
    /// Fails every other write.
    struct Flaky(Arc<Mutex<usize>>);
    impl SnapshotSink for Flaky {
        fn save(&mut self, _: &FrameBuffer) -> Result<(), RenderError> {
            let mut calls = self.0.lock().unwrap();
            *calls += 1;
            if *calls % 2 == 0 {
                Err(RenderError::Snapshot(
                    "flaky".to_string(),
                    std::io::Error::new(std::io::ErrorKind::Other, "try again"),
                ))
            } else {
                Ok(())
            }
        }
    }

    let config = settings(16, 16, 4, 3);
    let calls = Arc::new(Mutex::new(0));
    let report = render(&config, &mandelbrot(&config), Flaky(calls.clone())).unwrap();
    assert_eq!(report.tiles, 16);
    assert_eq!(*calls.lock().unwrap(), 16);
    assert_eq!(report.snapshots_written, 8);
    assert_eq!(report.snapshot_failures, 8);
}

#[test]
fn last_snapshot_on_disk_is_the_finished_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mandelbrot.ppm");
    let mut config = settings(30, 20, 7, 3);
    config.flush_every = 4;
    config.leftlower = Complex::new(-2.0, -1.0);
    config.rightupper = Complex::new(1.0, 1.0);
    let report = render(&config, &mandelbrot(&config), PpmFile::new(&path)).unwrap();

    let bytes = fs::read(&path).unwrap();
    let header = b"P6\n30 20\n255\n";
    assert_eq!(&bytes[..header.len()], &header[..]);
    assert_eq!(&bytes[header.len()..], report.frame.as_bytes());
    // 15 tiles: flushed after 4, 8 and 12, then once more at the end.
    assert_eq!(report.tiles, 15);
    assert_eq!(report.snapshots_written, 4);
}

#[test]
fn panicking_sink_fails_the_render_instead_of_hanging() {
    struct Exploding;
    impl SnapshotSink for Exploding {
        fn save(&mut self, _: &FrameBuffer) -> Result<(), RenderError> {
            panic!("out of disk and out of patience")
        }
    }

    let mut config = settings(16, 16, 4, 2);
    config.queue_capacity = Some(1);
    match render(&config, &mandelbrot(&config), Exploding) {
        Err(RenderError::ThreadPanic(_)) => (),
        other => panic!("expected a thread panic, got {:?}", other),
    }
}

#[test]
fn tile_larger_than_any_canvas_is_one_tile() {
    let config = settings(10, 10, usize::max_value(), 3);
    let report = render(&config, &mandelbrot(&config), Recorder::default()).unwrap();
    assert_eq!(report.tiles, 1);
    assert_eq!(report.arrival_order, vec![0]);
}
