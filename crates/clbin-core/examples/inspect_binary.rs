//! Inspect a dumped Intel OpenCL program binary without a GPU:
//!
//!     cargo run --example inspect_binary -- program.bin [kernel-name]
//!
//! Prints the header fields and kernel inventory; with a kernel name,
//! also extracts that kernel's instruction heap and prints its length.

use std::{env, fs, process};

use clbin_core::container::ProgramContainer;

fn main() {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: inspect_binary <program.bin> [kernel-name]");
        process::exit(1);
    };
    let kernel_name = args.next();

    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("cannot read {path}: {e}");
            process::exit(1);
        }
    };

    let container = match ProgramContainer::parse(&data) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("parse failed: {e}");
            process::exit(3);
        }
    };

    println!("magic:    {:#010x}", container.magic);
    println!("version:  {:#x}", container.version);
    println!("device:   {:#x}", container.device);
    println!("stepping: {:#x}", container.stepping);
    println!("program patch list: {} B", container.patch_list.len);
    println!("kernels:  {}", container.kernels.len());
    for k in &container.kernels {
        println!(
            "  {:?}  heap={} B  patch={} B  gsh={} dsh={} ssh={}",
            k.name,
            k.heap.len,
            k.patch_list.len,
            k.general_state_size,
            k.dynamic_state_size,
            k.surface_state_size,
        );
    }
    if container.trailing_bytes > 0 {
        println!("trailing bytes: {}", container.trailing_bytes);
    }

    if let Some(name) = kernel_name {
        match container.kernel_heap(&data, &name) {
            Ok(heap) => println!("kernel {name}: {} bytes of ISA", heap.len()),
            Err(e) => {
                eprintln!("{e}");
                process::exit(4);
            }
        }
    }
}
