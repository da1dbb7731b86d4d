//! End-to-end harness: build a small half→byte conversion kernel, pull
//! the compiled per-device binaries out of the program object, parse the
//! Intel container, extract the named kernel's instruction heap, then run
//! the kernel to show the pipeline actually works.
//!
//! Exit codes: 0 success, 2 runtime failure, 3 parse failure, 4 kernel
//! not found.

use bytemuck::cast_slice;
use std::{env, process, ptr};

use clbin_core::container::ProgramContainer;
use clbin_core::runtime::{Session, gpu_platform};
use clbin_core::{Error, GpuBuffer, Queued};

const DEFAULT_KERNEL: &str = "E_2_4";

// Two work groups, four elements each: vload_half4 + four byte stores.
const KERNEL_SOURCE: &str = concat!(
    "#pragma OPENCL EXTENSION cl_khr_fp16 : enable\n",
    "__kernel void E_2_4(__global unsigned char* data0, const __global half* data1) {\n",
    "  int gidx0 = get_group_id(0);\n",
    "  float4 val1_0 = vload_half4(0, data1 + gidx0 * 4);\n",
    "  data0[(gidx0 * 4) + 0] = val1_0.x;\n",
    "  data0[(gidx0 * 4) + 1] = val1_0.y;\n",
    "  data0[(gidx0 * 4) + 2] = val1_0.z;\n",
    "  data0[(gidx0 * 4) + 3] = val1_0.w;\n",
    "}\n",
);

// 1.0 .. 8.0 as IEEE binary16 bit patterns.
const HALF_INPUT: [u16; 8] = [
    0x3C00, 0x4000, 0x4200, 0x4400, 0x4500, 0x4600, 0x4700, 0x4800,
];

fn main() {
    let kernel_name = env::args().nth(1).unwrap_or_else(|| DEFAULT_KERNEL.to_owned());
    if let Err(e) = run(&kernel_name) {
        eprintln!("error: {e}");
        process::exit(e.exit_code());
    }
    #[cfg(feature = "metrics")]
    clbin_core::summary();
}

fn run(kernel_name: &str) -> Result<(), Error> {
    /* ---------- 1. OpenCL setup -------------------------------- */
    let (platform, devices) = gpu_platform()?;
    println!("platform: {}", platform.name()?);
    let session = Session::create(devices)?;
    for i in 0..session.device_count() {
        println!("device {i}: {}", session.device_name(i)?);
    }

    /* ---------- 2. build & fetch binaries ---------------------- */
    let program = session.build(KERNEL_SOURCE, "")?;
    let sizes = program.binary_sizes()?;
    for (i, size) in sizes.iter().enumerate() {
        println!("binary {i}: {size} bytes");
    }
    let binaries = program.binaries()?;

    /* ---------- 3. container introspection --------------------- */
    // Each binary parses on its own; a broken one does not block the rest.
    for (i, blob) in binaries.iter().enumerate().skip(1) {
        match ProgramContainer::parse(blob) {
            Ok(c) => println!("binary {i}: {} kernel(s)", c.kernels.len()),
            Err(e) => println!("binary {i}: unparseable ({e})"),
        }
    }

    let blob = &binaries[0];
    let container = ProgramContainer::parse(blob)?;
    println!("magic: {:#x}", container.magic);
    println!("version: {:#x}", container.version);
    println!("device: {:#x}", container.device);
    println!("kernels: {}", container.kernels.len());
    for k in &container.kernels {
        println!(
            "  {:?}: heap {} B, patch list {} B, unpadded {} B",
            k.name, k.heap.len, k.patch_list.len, k.unpadded_size
        );
    }
    if container.trailing_bytes > 0 {
        println!("trailing bytes: {}", container.trailing_bytes);
    }

    let heap = container.kernel_heap(blob, kernel_name)?;
    println!("kernel {kernel_name}: extracted {} bytes of ISA", heap.len());

    /* ---------- 4. run the kernel to close the loop ------------ */
    let kernel = program.kernel(kernel_name)?;

    let input: &[u8] = cast_slice(&HALF_INPUT);
    let in_buf = GpuBuffer::from_slice(&session.context, &session.queue, input)?;
    let out_buf = GpuBuffer::<Queued>::new(&session.context, HALF_INPUT.len())?;

    kernel.set_arg(0, out_buf.raw())?;
    kernel.set_arg(1, in_buf.raw())?;

    let global = [2usize, 1, 1];
    let local = [1usize, 1, 1];
    let evt = session.queue.enqueue_nd_range_kernel(
        kernel.get(),
        1,
        ptr::null(),
        global.as_ptr(),
        local.as_ptr(),
        &[],
    )?;

    let out_buf = out_buf.into_ready(evt.get())?;
    let mut result = [0u8; 8];
    let (_out_buf, guard) = out_buf.enqueue_read(&session.queue, &mut result)?;
    guard.wait()?;

    println!("output bytes: {result:?}");
    Ok(())
}
