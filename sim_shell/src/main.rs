use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use env_logger::{Builder, Env};
use mem_sim::modules::frame_allocator::{BTreeFrameAllocatorModule, FrameAllocatorModule};
use mem_sim::modules::physical_memory::{BufferPhysicalMemoryModule, PhysicalMemoryModule};
use mem_sim::{MemoryManager, PageTable, Variable};

mod command;
mod values;

use command::Command;

/// Simulated physical memory: 64 MiB.
const MEMORY_SIZE: u32 = 67_108_864;

type Manager = MemoryManager<BTreeFrameAllocatorModule>;

fn main() {
    Builder::from_env(Env::default())
        .format_module_path(false)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Error: you must specify the page size");
        process::exit(1);
    }

    let page_size: u32 = match args[1].parse() {
        Ok(size) if u32::is_power_of_two(size) => size,
        _ => {
            eprintln!("Error: page size must be a power of two");
            process::exit(1);
        }
    };

    run(page_size);
}

fn run(page_size: u32) {
    print_start_message(page_size);

    let mut memory = BufferPhysicalMemoryModule::new(MEMORY_SIZE as usize);
    let page_table = PageTable::new(page_size, BTreeFrameAllocatorModule::new());
    let mut manager = Manager::new(MEMORY_SIZE, page_table);

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        input.clear();
        if stdin.lock().read_line(&mut input).unwrap_or(0) == 0 {
            break;
        }
        let line = input.trim_end_matches(['\n', '\r']);
        if line == "exit" {
            break;
        }

        dispatch(line, &mut manager, &mut memory);
    }
}

fn print_start_message(page_size: u32) {
    println!(
        "Welcome to the Memory Allocation Simulator! Using a page size of {} bytes.",
        page_size
    );
    println!("Commands:");
    println!("  * create <text_size> <data_size> (initializes a new process)");
    println!("  * allocate <PID> <var_name> <data_type> <number_of_elements> (allocated memory on the heap)");
    println!("  * set <PID> <var_name> <offset> <value_0> <value_1> <value_2> ... <value_N> (set the value for a variable)");
    println!("  * free <PID> <var_name> (deallocate memory on the heap that is associated with <var_name>)");
    println!("  * terminate <PID> (kill the specified process)");
    println!("  * print <object> (prints data)");
    println!("    * If <object> is \"mmu\", print the MMU memory table");
    println!("    * if <object> is \"page\", print the page table");
    println!("    * if <object> is \"processes\", print a list of PIDs for processes that are still running");
    println!("    * if <object> is a \"<PID>:<var_name>\", print the value of the variable for that process");
    println!();
}

fn dispatch(line: &str, manager: &mut Manager, memory: &mut BufferPhysicalMemoryModule) {
    let Some(command) = Command::parse(line) else {
        if !line.trim().is_empty() {
            println!("error: command not recognized");
        }
        return;
    };

    match command {
        Command::Create {
            text_size,
            data_size,
        } => {
            let pid = manager.create_process(text_size, data_size);
            println!("{}", pid);
        }
        Command::Allocate {
            pid,
            name,
            data_type,
            num_elements,
        } => match manager.allocate(pid, &name, data_type, num_elements) {
            Ok(virtual_address) => println!("{}", virtual_address),
            Err(error) => println!("error: {}", error),
        },
        Command::Set {
            pid,
            name,
            offset,
            values,
        } => set_variable(manager, memory, pid, &name, offset, &values),
        Command::Free { pid, name } => {
            if let Err(error) = manager.free(pid, &name) {
                println!("error: {}", error);
            }
        }
        Command::Terminate { pid } => {
            if let Err(error) = manager.terminate(pid) {
                println!("error: {}", error);
            }
        }
        Command::Print { target } => print_command(&target, manager, memory),
    }
}

/// Writes `values` into the variable's elements starting at `offset`,
/// element by element so arrays spanning several pages land in the right
/// frames. Values past the end of the variable are dropped.
fn set_variable(
    manager: &Manager,
    memory: &mut BufferPhysicalMemoryModule,
    pid: u32,
    name: &str,
    offset: u32,
    values: &[String],
) {
    if manager.mmu().get_process(pid).is_none() {
        println!("error: process not found");
        return;
    }
    let Some(variable) = manager.mmu().get_variable(pid, name) else {
        println!("error: variable not found");
        return;
    };

    let data_type = variable.data_type;
    let element_size = data_type.element_size();
    if element_size == 0 {
        return;
    }
    let num_elements = variable.size / element_size;

    // Reject the whole command if any token does not parse; a half-written
    // array helps nobody.
    let mut encoded = Vec::with_capacity(values.len());
    for token in values {
        match values::encode_value(data_type, token) {
            Some(bytes) => encoded.push(bytes),
            None => {
                println!("error: command not recognized");
                return;
            }
        }
    }

    for (index, bytes) in encoded.iter().enumerate() {
        let element = offset as u64 + index as u64;
        if element >= num_elements as u64 {
            break;
        }

        let virtual_address = variable.virtual_address + element as u32 * element_size;
        if let Some(physical) = manager.page_table().get_physical_address(pid, virtual_address) {
            if memory.write(physical as usize, bytes).is_err() {
                log::warn!("physical address {:#X} is outside the memory buffer", physical);
            }
        }
    }
}

fn print_command(target: &str, manager: &Manager, memory: &BufferPhysicalMemoryModule) {
    match target {
        "mmu" => {
            let stdout = io::stdout();
            let _ = manager.mmu().write_table(&mut stdout.lock());
        }
        "page" => {
            let stdout = io::stdout();
            let _ = manager.page_table().write_table(&mut stdout.lock());
        }
        "processes" => {
            for process in manager.mmu().processes() {
                println!("{}", process.pid);
            }
        }
        _ => print_variable(target, manager, memory),
    }
}

/// Prints the first 4 element values of `<pid>:<name>`, then an item count
/// when the array is longer.
fn print_variable(target: &str, manager: &Manager, memory: &BufferPhysicalMemoryModule) {
    let Some((pid, name)) = parse_variable_target(target) else {
        println!("error: command not recognized");
        return;
    };

    if manager.mmu().get_process(pid).is_none() {
        println!("error: process not found");
        return;
    }
    let Some(variable) = manager.mmu().get_variable(pid, name) else {
        println!("error: variable not found");
        return;
    };

    let element_size = variable.data_type.element_size();
    if element_size == 0 {
        println!();
        return;
    }
    let num_elements = variable.size / element_size;

    for index in 0..num_elements {
        if index > 0 {
            print!(", ");
        }
        if index >= 4 {
            print!("... [{} items]", num_elements);
            break;
        }
        print!("{}", read_element(manager, memory, pid, variable, index));
    }
    println!();
}

fn read_element(
    manager: &Manager,
    memory: &BufferPhysicalMemoryModule,
    pid: u32,
    variable: &Variable,
    index: u32,
) -> String {
    let element_size = variable.data_type.element_size();
    let virtual_address = variable.virtual_address + index * element_size;

    let mut bytes = vec![0u8; element_size as usize];
    if let Some(physical) = manager.page_table().get_physical_address(pid, virtual_address) {
        let _ = memory.read(physical as usize, &mut bytes);
    }
    values::format_element(variable.data_type, &bytes)
}

fn parse_variable_target(target: &str) -> Option<(u32, &str)> {
    let (pid, name) = target.split_once(':')?;
    Some((pid.parse().ok()?, name))
}
