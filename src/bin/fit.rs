//! meshgrad-fit: optimize a mesh's vertices so its silhouette matches a box
//! target.
//!
//! Usage:
//!   meshgrad-fit --iters 200 --lr 1e-4 --size 256 --out out/
//!   meshgrad-fit --obj bunny.obj --adam --stream 127.0.0.1:8081

use meshgrad::core::MeshBatch;
use meshgrad::io::{load_obj, save_obj};
use meshgrad::optim::{fit_silhouette, rect_target, FitConfig, Optimizer};
use meshgrad::render::display::{depth_to_gray, grad_map_to_gray, silhouette_to_gray};
use meshgrad::viewer::{ImagePane, Message};
use meshgrad::{Camera, MapBatch, RenderSettings};
use nalgebra::Vector3;
use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;

fn main() {
    println!("meshgrad-fit v{}", meshgrad::VERSION);

    // Parse command-line arguments
    let mut args = std::env::args().skip(1);
    let mut obj_path: Option<PathBuf> = None;
    let mut out_dir: PathBuf = PathBuf::from("fit_output");
    let mut iters: usize = 200;
    let mut lr: f32 = 1e-4;
    let mut size: usize = 256;
    let mut distance: f32 = 2.0;
    let mut fov_deg: f32 = 45.0;
    let mut use_adam = false;
    let mut stream_addr: Option<String> = None;
    let mut stream_every: usize = 10;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--obj" => {
                obj_path = Some(PathBuf::from(args.next().expect("Missing --obj argument")));
            }
            "--out" => {
                out_dir = PathBuf::from(args.next().expect("Missing --out argument"));
            }
            "--iters" => {
                iters = args
                    .next()
                    .expect("Missing --iters argument")
                    .parse()
                    .expect("Invalid iteration count");
            }
            "--lr" => {
                lr = args
                    .next()
                    .expect("Missing --lr argument")
                    .parse()
                    .expect("Invalid learning rate");
            }
            "--size" => {
                size = args
                    .next()
                    .expect("Missing --size argument")
                    .parse()
                    .expect("Invalid image size");
            }
            "--distance" => {
                distance = args
                    .next()
                    .expect("Missing --distance argument")
                    .parse()
                    .expect("Invalid camera distance");
            }
            "--fov" => {
                fov_deg = args
                    .next()
                    .expect("Missing --fov argument")
                    .parse()
                    .expect("Invalid field of view");
            }
            "--adam" => {
                use_adam = true;
            }
            "--stream" => {
                stream_addr = Some(args.next().expect("Missing --stream argument"));
            }
            "--stream-every" => {
                stream_every = args
                    .next()
                    .expect("Missing --stream-every argument")
                    .parse()
                    .expect("Invalid stream interval");
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_help();
                std::process::exit(1);
            }
        }
    }

    if size < 2 {
        eprintln!("Error: --size must be at least 2");
        std::process::exit(1);
    }

    if let Err(e) = run(
        obj_path,
        out_dir,
        iters,
        lr,
        size,
        distance,
        fov_deg,
        use_adam,
        stream_addr,
        stream_every.max(1),
    ) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run(
    obj_path: Option<PathBuf>,
    out_dir: PathBuf,
    iters: usize,
    lr: f32,
    size: usize,
    distance: f32,
    fov_deg: f32,
    use_adam: bool,
    stream_addr: Option<String>,
    stream_every: usize,
) -> anyhow::Result<()> {
    let mut mesh = match &obj_path {
        Some(path) => {
            let (vertices, faces) = load_obj(path)?;
            println!(
                "[fit] loaded {}: {} vertices, {} faces",
                path.display(),
                vertices.len(),
                faces.len()
            );
            MeshBatch::single(vertices, faces)?
        }
        None => {
            println!("[fit] no --obj given, using the built-in triangle");
            MeshBatch::single(
                vec![
                    Vector3::new(-0.5, -0.5, 0.0),
                    Vector3::new(0.5, -0.5, 0.0),
                    Vector3::new(0.0, 0.5, 0.0),
                ],
                vec![[0, 1, 2]],
            )?
        }
    };

    // Box target: pixel window [30, 225) at 256 resolution, scaled to size.
    let lo = 30 * size / 256;
    let hi = 225 * size / 256;
    let target = rect_target(size, size, lo, hi, lo, hi);

    let cfg = FitConfig {
        settings: RenderSettings::new(size, size, 0.1, 100.0),
        camera: Camera::new(distance, 0.0, 0.0, fov_deg),
        iters,
        lr,
        optimizer: if use_adam {
            Optimizer::Adam
        } else {
            Optimizer::Sgd
        },
        log_every: 10,
    };

    std::fs::create_dir_all(&out_dir)?;
    silhouette_to_gray(&target, 0).save(out_dir.join("target.png"))?;

    let outputs = match stream_addr {
        Some(addr) => {
            let mut stream = TcpStream::connect(&addr)?;
            println!("[fit] streaming progress to {addr}");
            send_frame(
                &mut stream,
                &Message::InitObject {
                    vertices: mesh.vertices(0).to_vec(),
                    faces: mesh.faces(0).to_vec(),
                },
            )?;
            send_frame(
                &mut stream,
                &Message::InitImageArea {
                    width: size as u32,
                    height: size as u32,
                },
            )?;

            // Fit in chunks so the viewer sees intermediate states.
            let mut losses = Vec::with_capacity(iters);
            let mut initial_silhouette = None;
            let mut last = None;
            let mut done = 0;
            while done < iters {
                let chunk = stream_every.min(iters - done);
                let chunk_cfg = FitConfig {
                    iters: chunk,
                    ..cfg
                };
                let out = fit_silhouette(&mut mesh, &target, &chunk_cfg)?;
                losses.extend_from_slice(&out.losses);
                if initial_silhouette.is_none() {
                    initial_silhouette = Some(out.initial_silhouette.clone());
                }
                send_progress(&mut stream, &mesh, &target, &out, &cfg)?;
                last = Some(out);
                done += chunk;
            }

            let mut out = last.ok_or_else(|| anyhow::anyhow!("no iterations were run"))?;
            out.losses = losses;
            if let Some(s) = initial_silhouette {
                out.initial_silhouette = s;
            }
            out
        }
        None => fit_silhouette(&mut mesh, &target, &cfg)?,
    };

    if let (Some(first), Some(last)) = (outputs.losses.first(), outputs.losses.last()) {
        println!("[fit] loss {first:.6} -> {last:.6} over {} iterations", iters);
    }

    silhouette_to_gray(&outputs.initial_silhouette, 0).save(out_dir.join("initial.png"))?;
    silhouette_to_gray(&outputs.final_silhouette, 0).save(out_dir.join("final.png"))?;
    depth_to_gray(
        &outputs.final_depth,
        0,
        cfg.settings.near,
        cfg.settings.far,
    )
    .save(out_dir.join("depth.png"))?;
    grad_map_to_gray(&outputs.final_grad_map, 0).save(out_dir.join("grad.png"))?;
    save_obj(&out_dir.join("fitted.obj"), mesh.vertices(0), mesh.faces(0))?;
    println!("[fit] wrote results to {}", out_dir.display());

    Ok(())
}

/// Frames are length-prefixed (u32 LE) because a raw TCP stream has no
/// message boundaries of its own.
fn send_frame(stream: &mut TcpStream, msg: &Message) -> anyhow::Result<()> {
    let frame = msg.encode();
    stream.write_all(&(frame.len() as u32).to_le_bytes())?;
    stream.write_all(&frame)?;
    Ok(())
}

fn send_progress(
    stream: &mut TcpStream,
    mesh: &MeshBatch,
    target: &MapBatch<u8>,
    out: &meshgrad::optim::FitOutputs,
    cfg: &FitConfig,
) -> anyhow::Result<()> {
    send_frame(
        stream,
        &Message::UpdateObject {
            vertices: mesh.vertices(0).to_vec(),
        },
    )?;

    let panes = [
        (ImagePane::TopLeft, silhouette_to_gray(target, 0)),
        (ImagePane::TopRight, silhouette_to_gray(&out.final_silhouette, 0)),
        (ImagePane::BottomLeft, grad_map_to_gray(&out.final_grad_map, 0)),
        (
            ImagePane::BottomRight,
            depth_to_gray(&out.final_depth, 0, cfg.settings.near, cfg.settings.far),
        ),
    ];
    for (pane, img) in panes {
        let (w, h) = img.dimensions();
        send_frame(
            stream,
            &Message::UpdateImage {
                pane,
                height: h,
                width: w,
                pixels: img.into_raw(),
            },
        )?;
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"meshgrad-fit: fit a mesh silhouette to a box target

Options:
  --obj <path>          Mesh to optimize (default: built-in triangle)
  --out <dir>           Output directory (default: fit_output)
  --iters <n>           Optimization iterations (default: 200)
  --lr <f>              Learning rate (default: 1e-4)
  --size <n>            Square image size in pixels (default: 256)
  --distance <f>        Camera distance (default: 2.0)
  --fov <f>             Vertical field of view, degrees (default: 45)
  --adam                Use Adam instead of plain gradient descent
  --stream <addr>       Stream progress frames to a TCP viewer
  --stream-every <n>    Iterations between streamed frames (default: 10)
  -h, --help            Show this help"#
    );
}
