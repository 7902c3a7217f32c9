// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builds a small text document inside a growable buffer through the stream
//! front end, then serializes the buffer's spans to standard output.

use std::io::{self, Write};

use dynbuf::{BufStream, VecBuf, write_spans};

fn main() -> io::Result<()> {
    let mut buf = VecBuf::new();

    {
        let mut stream = BufStream::new(&mut buf);

        stream.write_all(b"# Inventory\n")?;

        for (name, count) in [("bolts", 48), ("nuts", 96), ("washers", 1024)] {
            writeln!(stream, "{name}: {count}")?;
        }

        // Dropping the stream commits everything written into `buf`.
    }

    let written = write_spans(&buf, &mut io::stdout().lock())?;
    eprintln!("{written} bytes written");

    Ok(())
}
