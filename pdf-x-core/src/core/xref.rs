use super::base_stream::BaseStream;
use super::decode;
use super::error::{PDFError, PDFResult};
use super::lexer::Lexer;
use super::parser::{PDFObject, Parser, Ref};
use super::stream::Stream;
use lru::LruCache;
use std::collections::HashMap;  // Still needed for String keys in dictionaries
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Cross-reference table entry.
///
/// Each entry in the xref table describes where to find an indirect object
/// in the PDF file. Based on PDF.js's XRef entry structure.
#[derive(Debug, Clone)]
pub enum XRefEntry {
    /// Free entry - object number is available for reuse
    Free { next_free: u64, generation: u32 },

    /// Uncompressed entry - object is stored uncompressed at given offset
    Uncompressed { offset: u64, generation: u32 },

    /// Compressed entry - object is stored in an object stream
    Compressed {
        obj_stream_num: u32,
        index: u32,
    },
}

impl XRefEntry {
    /// Returns true if this entry is free.
    pub fn is_free(&self) -> bool {
        matches!(self, XRefEntry::Free { .. })
    }

    /// Returns the generation number for this entry.
    pub fn generation(&self) -> u32 {
        match self {
            XRefEntry::Free { generation, .. } => *generation,
            XRefEntry::Uncompressed { generation, .. } => *generation,
            XRefEntry::Compressed { .. } => 0,
        }
    }
}

/// Cross-reference table for a PDF document.
///
/// The xref table maps object numbers to their locations in the PDF file.
/// This allows indirect object references (like "5 0 R") to be resolved.
///
/// Based on PDF.js src/core/xref.js
pub struct XRef {
    /// The entries in the xref table, indexed by object number
    entries: Vec<Option<XRefEntry>>,

    /// Cache of parsed objects (object number -> PDFObject)
    /// Uses Rc to avoid expensive cloning of large objects
    /// Uses LRU cache with FxHashMap for bounded memory and fast access
    /// Default capacity: 1000 objects (~10MB for typical PDFs)
    cache: LruCache<u32, Rc<PDFObject>, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>,

    /// The trailer dictionary
    trailer: Option<PDFObject>,

    /// Stream to read PDF data from
    stream: Box<dyn BaseStream>,
}

impl XRef {
    /// Creates a new XRef table.
    pub fn new(stream: Box<dyn BaseStream>) -> Self {
        // Default cache capacity: 1000 objects
        // This is enough for most PDFs while keeping memory bounded
        let capacity = NonZeroUsize::new(1000).unwrap();
        let cache = LruCache::with_hasher(
            capacity,
            std::hash::BuildHasherDefault::<rustc_hash::FxHasher>::default(),
        );

        XRef {
            entries: Vec::new(),
            cache,
            trailer: None,
            stream,
        }
    }

    /// Sets the stream position for parsing.
    pub fn set_stream_pos(&mut self, pos: usize) -> PDFResult<()> {
        self.stream.set_pos(pos)
    }

    /// Parses the cross-reference table starting at the current stream position.
    ///
    /// This reads either a traditional xref table or an XRef stream (PDF 1.5+).
    /// It also follows /Prev entries to handle incremental updates.
    ///
    /// Traditional xref table format:
    /// ```text
    /// xref
    /// 0 6
    /// 0000000000 65535 f
    /// 0000000015 00000 n
    /// ...
    /// trailer
    /// << /Size 6 /Root 1 0 R >>
    /// ```
    ///
    /// XRef stream format (PDF 1.5+):
    /// ```text
    /// N 0 obj
    /// << /Type /XRef /Size 6 /W [1 2 1] /Root 1 0 R >>
    /// stream
    /// ...binary data...
    /// endstream
    /// endobj
    /// ```
    pub fn parse(&mut self) -> PDFResult<()> {
        let start_pos = self.stream.pos();

        // Queue of xref positions to process (handles /Prev chain)
        let mut xref_queue = vec![start_pos];

        // Cache to prevent infinite loops from circular /Prev references
        let mut parsed_positions = std::collections::HashSet::new();

        // The first trailer we encounter (from the end of the file) is the main trailer
        let mut main_trailer: Option<PDFObject> = None;

        while let Some(pos) = xref_queue.pop() {
            // Skip if we've already parsed this position (circular reference protection)
            if !parsed_positions.insert(pos) {
                continue;
            }

            // Position stream at this xref location
            self.stream.set_pos(pos)?;

            let lexer = Lexer::new(self.stream.make_sub_stream(
                pos,
                self.stream.length() - pos,
            )?)?;
            let mut parser = Parser::new(lexer)?;

            // First token could be "xref" (traditional) or a number (XRef stream object)
            let obj = parser.get_object()?;

            let trailer = match obj {
                obj if obj.is_command("xref") => {
                    // Traditional xref table
                    self.read_xref_table(&mut parser)?;

                    // read_xref_table consumed the "trailer" keyword, so read the dictionary directly
                    let trailer = parser.get_object()?;
                    if !matches!(trailer, PDFObject::Dictionary(_)) {
                        return Err(PDFError::Generic(
                            "Expected trailer dictionary".to_string(),
                        ));
                    }

                    trailer
                }
                PDFObject::Number(_obj_num) => {
                    // Might be an XRef stream - format: N 0 obj << /Type /XRef >> stream...endstream
                    let generation = parser.get_object()?;
                    let obj_keyword = parser.get_object()?;

                    // Verify this is an indirect object
                    if !matches!(generation, PDFObject::Number(0.0)) {
                        return Err(PDFError::Generic(
                            "XRef stream must have generation 0".to_string(),
                        ));
                    }

                    if !obj_keyword.is_command("obj") {
                        return Err(PDFError::Generic(format!(
                            "Expected 'obj' keyword, got {:?}",
                            obj_keyword
                        )));
                    }

                    // Read the object (should be a Stream with /Type /XRef)
                    let xref_obj = parser.get_object()?;

                    match xref_obj {
                        PDFObject::Stream { dict, data } => {
                            // Verify it's an XRef stream
                            if let Some(PDFObject::Name(type_name)) = dict.get("Type") {
                                if type_name != "XRef" {
                                    return Err(PDFError::Generic(format!(
                                        "Expected /Type /XRef, got /Type /{}",
                                        type_name
                                    )));
                                }
                            } else {
                                return Err(PDFError::Generic(
                                    "XRef stream missing /Type entry".to_string(),
                                ));
                            }

                            // Parse the XRef stream
                            self.parse_xref_stream(&dict, &data)?;

                            // The trailer dictionary is the stream dictionary itself
                            PDFObject::Dictionary(dict)
                        }
                        _ => {
                            return Err(PDFError::Generic(
                                "Expected XRef stream object".to_string(),
                            ))
                        }
                    }
                }
                _ => {
                    return Err(PDFError::Generic(format!(
                        "Expected 'xref' keyword or object number, got {:?}",
                        obj
                    )))
                }
            };

            // Save the first trailer as the main trailer
            if main_trailer.is_none() {
                main_trailer = Some(trailer.clone());
            }

            // Check for /Prev entry and add to queue
            if let PDFObject::Dictionary(ref dict) = trailer {
                if let Some(prev_obj) = dict.get("Prev") {
                    match prev_obj {
                        PDFObject::Number(n) => {
                            let prev_pos = *n as usize;
                            xref_queue.push(prev_pos);
                        }
                        PDFObject::Ref(Ref { num, .. }) => {
                            // Non-compliant PDFs might use a reference for /Prev
                            // (ISO 32000 requires a direct number); treat the
                            // object number as a heuristic position.
                            xref_queue.push(*num as usize);
                        }
                        _ => {
                            // Invalid /Prev entry, ignore it
                        }
                    }
                }
            }
        }

        // Set the main trailer
        self.trailer = main_trailer;

        Ok(())
    }

    /// Parses an XRef stream (PDF 1.5+).
    ///
    /// XRef streams encode the cross-reference table as binary data in a stream.
    /// Dictionary keys:
    /// - /W [w1 w2 w3]: byte widths for type, offset/obj_stream_num, generation/index
    /// - /Index [first1 n1 first2 n2 ...]: ranges of object numbers (default: [0, Size])
    /// - /Size: total number of entries
    ///
    /// Entry types:
    /// - Type 0: Free entry (offset = next free obj, generation = generation)
    /// - Type 1: Uncompressed entry (offset = byte offset, generation = generation)
    /// - Type 2: Compressed entry (offset = obj stream num, generation = index in stream)
    ///
    /// Based on PDF.js processXRefStream()
    fn parse_xref_stream(
        &mut self,
        dict: &HashMap<String, PDFObject>,
        data: &[u8],
    ) -> PDFResult<()> {
        // Get W array (byte widths)
        let w_array = dict
            .get("W")
            .ok_or_else(|| PDFError::Generic("XRef stream missing /W entry".to_string()))?;

        let widths = match w_array {
            PDFObject::Array(arr) => {
                if arr.len() != 3 {
                    return Err(PDFError::Generic(format!(
                        "XRef stream /W must have 3 elements, got {}",
                        arr.len()
                    )));
                }
                let w1 = match &*arr[0] {
                    PDFObject::Number(n) => *n as usize,
                    _ => return Err(PDFError::Generic("/W[0] must be a number".to_string())),
                };
                let w2 = match &*arr[1] {
                    PDFObject::Number(n) => *n as usize,
                    _ => return Err(PDFError::Generic("/W[1] must be a number".to_string())),
                };
                let w3 = match &*arr[2] {
                    PDFObject::Number(n) => *n as usize,
                    _ => return Err(PDFError::Generic("/W[2] must be a number".to_string())),
                };
                (w1, w2, w3)
            }
            _ => return Err(PDFError::Generic("/W must be an array".to_string())),
        };

        // Get Index array (ranges) - default is [0, Size]
        let index_array = if let Some(index) = dict.get("Index") {
            match index {
                PDFObject::Array(arr) => arr.clone(),
                _ => return Err(PDFError::Generic("/Index must be an array".to_string())),
            }
        } else {
            // Default: [0, Size]
            let size = dict
                .get("Size")
                .ok_or_else(|| PDFError::Generic("XRef stream missing /Size".to_string()))?;
            match size {
                PDFObject::Number(n) => {
                    use smallvec::smallvec;
                    smallvec![Box::new(PDFObject::Number(0.0)), Box::new(PDFObject::Number(*n))]
                }
                _ => return Err(PDFError::Generic("/Size must be a number".to_string())),
            }
        };

        // Decompress the stream data if needed
        let filter_name = dict.get("Filter").and_then(|f| match f {
            PDFObject::Name(name) => Some(name.as_str()),
            _ => None,
        });

        let mut decompressed_data = decode::decode_stream(data, filter_name)
            .map_err(|e| PDFError::Generic(format!("XRef stream decode error: {}", e)))?;

        // Apply PNG predictor if specified in DecodeParms
        if let Some(decode_parms) = dict.get("DecodeParms") {
            if let PDFObject::Dictionary(parms) = decode_parms {
                // Check for Predictor
                if let Some(PDFObject::Number(predictor)) = parms.get("Predictor") {
                    let pred = *predictor as i32;
                    // PNG predictor values are 10-14 (10 = None, 11 = Sub, 12 = Up, 13 = Average, 14 = Paeth)
                    if pred >= 10 && pred <= 14 {
                        // Get Columns parameter (required for PNG predictor)
                        let columns = parms
                            .get("Columns")
                            .and_then(|obj| match obj {
                                PDFObject::Number(n) => Some(*n as usize),
                                _ => None,
                            })
                            .unwrap_or(1);

                        // Get Colors parameter (default 1)
                        let colors = parms
                            .get("Colors")
                            .and_then(|obj| match obj {
                                PDFObject::Number(n) => Some(*n as usize),
                                _ => None,
                            })
                            .unwrap_or(1);

                        // Get BitsPerComponent (default 8)
                        let bits_per_component = parms
                            .get("BitsPerComponent")
                            .and_then(|obj| match obj {
                                PDFObject::Number(n) => Some(*n as usize),
                                _ => None,
                            })
                            .unwrap_or(8);

                        // Apply PNG predictor
                        decompressed_data = decode::decode_png_predictor(
                            &decompressed_data,
                            colors,
                            bits_per_component,
                            columns,
                        )
                        .map_err(|e| {
                            PDFError::Generic(format!("PNG predictor decode error: {}", e))
                        })?;
                    }
                }
            }
        }

        
        // Parse entries from the decompressed data
        let (w1, w2, w3) = widths;
        let entry_size = w1 + w2 + w3;
        let mut pos = 0;

        // Process each range in the Index array
        let mut i = 0;
        while i < index_array.len() {
            let first = match &*index_array[i] {
                PDFObject::Number(n) => *n as u32,
                _ => {
                    return Err(PDFError::Generic(
                        "Index entry must be a number".to_string(),
                    ))
                }
            };

            let count = match &*index_array[i + 1] {
                PDFObject::Number(n) => *n as usize,
                _ => {
                    return Err(PDFError::Generic(
                        "Index entry must be a number".to_string(),
                    ))
                }
            };

            // Read 'count' entries starting from 'first'
            for j in 0..count {
                if pos + entry_size > decompressed_data.len() {
                    return Err(PDFError::Generic(
                        "XRef stream data truncated".to_string(),
                    ));
                }

                // Read type field (w1 bytes)
                let entry_type = if w1 > 0 {
                    read_big_endian(&decompressed_data[pos..pos + w1])
                } else {
                    1 // Default type is 1 if w1 == 0
                };
                pos += w1;

                // Read second field (w2 bytes) - offset or obj stream num
                let field2 = if w2 > 0 {
                    read_big_endian(&decompressed_data[pos..pos + w2])
                } else {
                    0
                };
                pos += w2;

                // Read third field (w3 bytes) - generation or index
                let field3 = if w3 > 0 {
                    read_big_endian(&decompressed_data[pos..pos + w3])
                } else {
                    0
                };
                pos += w3;

                // Create entry based on type
                let obj_num = first + j as u32;
                let entry = match entry_type {
                    0 => XRefEntry::Free {
                        next_free: field2,
                        generation: field3 as u32,
                    },
                    1 => XRefEntry::Uncompressed {
                        offset: field2,
                        generation: field3 as u32,
                    },
                    2 => XRefEntry::Compressed {
                        obj_stream_num: field2 as u32,
                        index: field3 as u32,
                    },
                    _ => {
                        return Err(PDFError::xref_error(format!(
                            "Invalid XRef entry type: {} at object {}",
                            entry_type, obj_num
                        )))
                    }
                };

                // Ensure entries vector is large enough
                while self.entries.len() <= obj_num as usize {
                    self.entries.push(None);
                }

                // Only set if not already set (first entry wins)
                if self.entries[obj_num as usize].is_none() {
                    self.entries[obj_num as usize] = Some(entry);
                }
            }

            i += 2;
        }

        Ok(())
    }

    /// Reads xref table subsections.
    ///
    /// Each subsection starts with two numbers: first object number and count.
    /// Then follows one entry per line with: offset generation_number type
    fn read_xref_table(&mut self, parser: &mut Parser) -> PDFResult<()> {
        loop {
            // Peek at the next object to see if it's "trailer"
            let first_obj = parser.get_object()?;

            // Check if we've reached the trailer
            if first_obj.is_command("trailer") {
                // We've hit the trailer, but we need to "put it back"
                // Since we can't really put it back, we'll just break
                // and let the caller know to expect trailer was already consumed
                // Actually, let's just return Ok since we read the trailer keyword
                return Ok(());
            }

            // Get first object number
            let first = match first_obj {
                PDFObject::Number(n) => n as u32,
                _ => {
                    return Err(PDFError::Generic(format!(
                        "Expected subsection start number or 'trailer', got {:?}",
                        first_obj
                    )))
                }
            };

            // Get count
            let count_obj = parser.get_object()?;
            let count = match count_obj {
                PDFObject::Number(n) => n as u32,
                _ => {
                    return Err(PDFError::Generic(format!(
                        "Expected subsection count, got {:?}",
                        count_obj
                    )))
                }
            };

            // Ensure we have enough space in the entries vector
            let needed_size = (first + count) as usize;
            if self.entries.len() < needed_size {
                self.entries.resize(needed_size, None);
            }

            // Read each entry in the subsection
            for i in 0..count {
                let entry = self.read_xref_entry(parser)?;
                let obj_num = (first + i) as usize;

                // Only set if not already set (first xref wins)
                if self.entries[obj_num].is_none() {
                    self.entries[obj_num] = Some(entry);
                }
            }
        }
    }

    /// Reads a single xref entry.
    ///
    /// Format: offset generation type
    /// Example: 0000000015 00000 n
    fn read_xref_entry(&mut self, parser: &mut Parser) -> PDFResult<XRefEntry> {
        // Read offset/next_free
        let offset_obj = parser.get_object()?;
        let offset = match offset_obj {
            PDFObject::Number(n) => n as u64,
            _ => {
                return Err(PDFError::Generic(format!(
                    "Expected offset in xref entry, got {:?}",
                    offset_obj
                )))
            }
        };

        // Read generation number
        let gen_obj = parser.get_object()?;
        let generation = match gen_obj {
            PDFObject::Number(n) => n as u32,
            _ => {
                return Err(PDFError::Generic(format!(
                    "Expected generation in xref entry, got {:?}",
                    gen_obj
                )))
            }
        };

        // Read type (f = free, n = in use)
        let type_obj = parser.get_object()?;
        let entry_type = match type_obj {
            obj if obj.is_command("f") => "f",
            obj if obj.is_command("n") => "n",
            _ => {
                return Err(PDFError::Generic(format!(
                    "Expected 'f' or 'n' in xref entry, got {:?}",
                    type_obj
                )))
            }
        };

        let entry = match entry_type {
            "f" => XRefEntry::Free {
                next_free: offset,
                generation,
            },
            "n" => XRefEntry::Uncompressed { offset, generation },
            _ => unreachable!(),
        };

        Ok(entry)
    }

    /// Gets an entry from the xref table.
    pub fn get_entry(&self, obj_num: u32) -> Option<&XRefEntry> {
        self.entries.get(obj_num as usize)?.as_ref()
    }

    /// Fetches an object from a compressed object stream (ObjStm).
    ///
    /// Object streams contain multiple PDF objects in a compressed format.
    /// The stream format is:
    /// ```text
    /// N1 offset1 N2 offset2 ... Nn offsetn [object1] [object2] ... [objectn]
    /// ```
    ///
    /// Based on PDF.js fetchCompressed method.
    ///
    /// # Arguments
    /// * `obj_stream_num` - The object number of the ObjStm
    /// * `index` - The index of the object within the stream (0-based)
    ///
    /// # Returns
    /// The requested object wrapped in Rc
    fn fetch_compressed(&mut self, obj_stream_num: u32, index: u32) -> PDFResult<Rc<PDFObject>> {
        // First, fetch the object stream itself (as an uncompressed object)
        let obj_stream_obj = self.fetch(obj_stream_num, 0)?;

        // The object stream must be a Stream object with dictionary and data
        match &*obj_stream_obj {
            PDFObject::Stream { dict, data } => {
                // Check if this is an ObjStm
                if let Some(PDFObject::Name(type_name)) = dict.get("Type") {
                    if type_name != "ObjStm" {
                        return Err(PDFError::Generic(format!(
                            "Expected ObjStm type, got /{}",
                            type_name
                        )));
                    }
                }

                // Get N (number of objects) and First (byte offset of first object)
                let n = dict
                    .get("N")
                    .and_then(|obj| match obj {
                        PDFObject::Number(n) => Some(*n as u32),
                        _ => None,
                    })
                    .ok_or_else(|| PDFError::Generic("ObjStm missing /N parameter".to_string()))?;

                let first = dict
                    .get("First")
                    .and_then(|obj| match obj {
                        PDFObject::Number(n) => Some(*n as usize),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        PDFError::Generic("ObjStm missing /First parameter".to_string())
                    })?;

                if index >= n {
                    return Err(PDFError::Generic(format!(
                        "Index {} out of range for ObjStm with {} objects",
                        index, n
                    )));
                }

                // Decompress the stream data if needed
                let filter_name = dict.get("Filter").and_then(|f| match f {
                    PDFObject::Name(name) => Some(name.as_str()),
                    _ => None,
                });

                let mut decompressed_data = decode::decode_stream(data, filter_name)
                    .map_err(|e| PDFError::Generic(format!("ObjStm decode error: {}", e)))?;

                // Apply PNG predictor if specified in DecodeParms
                if let Some(decode_parms) = dict.get("DecodeParms") {
                    if let PDFObject::Dictionary(parms) = decode_parms {
                        // Check for Predictor
                        if let Some(PDFObject::Number(predictor)) = parms.get("Predictor") {
                            let pred = *predictor as i32;
                            // PNG predictor values are 10-14
                            if pred >= 10 && pred <= 14 {
                                let columns = parms
                                    .get("Columns")
                                    .and_then(|obj| match obj {
                                        PDFObject::Number(n) => Some(*n as usize),
                                        _ => None,
                                    })
                                    .unwrap_or(1);

                                let colors = parms
                                    .get("Colors")
                                    .and_then(|obj| match obj {
                                        PDFObject::Number(n) => Some(*n as usize),
                                        _ => None,
                                    })
                                    .unwrap_or(1);

                                let bits_per_component = parms
                                    .get("BitsPerComponent")
                                    .and_then(|obj| match obj {
                                        PDFObject::Number(n) => Some(*n as usize),
                                        _ => None,
                                    })
                                    .unwrap_or(8);

                                decompressed_data = decode::decode_png_predictor(
                                    &decompressed_data,
                                    colors,
                                    bits_per_component,
                                    columns,
                                )
                                .map_err(|e| {
                                    PDFError::Generic(format!("PNG predictor decode error: {}", e))
                                })?;
                            }
                        }
                    }
                }

                // Parse the object number/offset pairs (first N pairs of integers)
                let index_stream = Stream::from_bytes(decompressed_data[..first].to_vec());
                let lexer = Lexer::new(Box::new(index_stream) as Box<dyn BaseStream>)?;
                let mut parser = Parser::new(lexer)?;

                // Read all object numbers and offsets
                let mut obj_nums = Vec::with_capacity(n as usize);
                let mut offsets = Vec::with_capacity(n as usize);

                for _ in 0..n {
                    let num = parser.get_object()?;
                    let offset = parser.get_object()?;

                    let obj_num = match num {
                        PDFObject::Number(n) => n as u32,
                        _ => {
                            return Err(PDFError::Generic(format!(
                                "Expected object number, got {:?}",
                                num
                            )))
                        }
                    };

                    let obj_offset = match offset {
                        PDFObject::Number(n) => n as usize,
                        _ => {
                            return Err(PDFError::Generic(format!(
                                "Expected offset, got {:?}",
                                offset
                            )))
                        }
                    };

                    obj_nums.push(obj_num);
                    offsets.push(obj_offset);
                }

                // Now parse the object at the requested index
                let obj_offset = first + offsets[index as usize];
                let obj_length = if (index as usize) < offsets.len() - 1 {
                    offsets[index as usize + 1]
                } else {
                    decompressed_data.len() - obj_offset
                };

                // Create a stream for just this object's data
                let obj_data = decompressed_data[obj_offset..obj_offset + obj_length].to_vec();
                let obj_stream = Stream::from_bytes(obj_data);
                let obj_lexer = Lexer::new(Box::new(obj_stream) as Box<dyn BaseStream>)?;
                let mut obj_parser = Parser::new(obj_lexer)?;

                // Parse the object (no "obj"/"endobj" wrappers in ObjStm)
                let object = Rc::new(obj_parser.get_object()?);

                // Cache it with the actual object number
                let actual_obj_num = obj_nums[index as usize];
                self.cache.put(actual_obj_num, Rc::clone(&object));

                Ok(object)
            }
            PDFObject::Dictionary(_) => {
                // If it's just a dictionary without stream data, we can't decompress it yet
                Err(PDFError::Generic(
                    "ObjStm is a dictionary but stream data parsing not yet implemented".to_string(),
                ))
            }
            _ => Err(PDFError::Generic(
                "ObjStm is not a stream or dictionary".to_string(),
            )),
        }
    }

    /// Fetches an indirect object by reference.
    ///
    /// This resolves an indirect reference like "5 0 R" to its actual object.
    /// The object is cached after being parsed. Returns an Rc to avoid expensive cloning.
    pub fn fetch(&mut self, obj_num: u32, generation: u32) -> PDFResult<Rc<PDFObject>> {
        // Check cache first - Rc::clone is cheap (just increments refcount)
        if let Some(cached) = self.cache.get(&obj_num) {
            return Ok(Rc::clone(cached));
        }

        // Get xref entry
        let entry = self
            .get_entry(obj_num)
            .ok_or_else(|| PDFError::Generic(format!("Object {} not found in xref", obj_num)))?;

        match entry {
            XRefEntry::Free { .. } => Err(PDFError::Generic(format!(
                "Cannot fetch free object {}",
                obj_num
            ))),

            XRefEntry::Uncompressed {
                offset,
                generation: entry_gen,
            } => {
                // Verify generation number matches
                if generation != *entry_gen {
                    return Err(PDFError::Generic(format!(
                        "Generation mismatch for object {}: expected {}, got {}",
                        obj_num, entry_gen, generation
                    )));
                }

                // Clone the offset to avoid borrow checker issues
                let offset_value = *offset;

                // Create a sub-stream starting at the object's position
                // No need to manipulate parent stream position - sub-stream is independent
                let sub_stream = self.stream.make_sub_stream(
                    offset_value as usize,
                    self.stream.length() - offset_value as usize,
                )?;

                // Parse the indirect object
                // Format: N G obj ... endobj
                let lexer = Lexer::new(sub_stream)?;
                let mut parser = Parser::new(lexer)?;

                // CRITICAL FIX: Set up a reference resolver so the parser can resolve
                // indirect /Length references in streams. Without this, streams with
                // /Length references fall back to scanning for "endstream" which can
                // read incorrect boundaries and capture "endobj" as stream data.
                //
                // We create a closure that captures a mutable reference to self.
                // This is safe because:
                // 1. The resolver is only called during parser.get_object() below
                // 2. We're not modifying the XRef entries during fetch (only reading/caching)
                // 3. Rust's borrow checker ensures no other mutable borrows exist
                //
                // However, we can't directly capture &mut self in the closure because
                // it would create a self-referential struct. Instead, we'll use an
                // unsafe pointer cast. This is safe because:
                // - The parser lifetime is scoped to this function
                // - We ensure no re-entrant calls that could invalidate the pointer
                // - The XRef object is not moved or dropped during parsing
                let self_ptr = self as *mut XRef;
                parser.set_ref_resolver(move |num, generation| {
                    // SAFETY: This is safe because:
                    // 1. self_ptr is valid for the duration of parser.get_object()
                    // 2. No other code can modify or move the XRef during this time
                    // 3. We're only calling fetch() which is part of XRef's public API
                    unsafe { (*self_ptr).fetch(num, generation) }
                        .map(|rc| (*rc).clone())
                });

                // Read object number
                let num_obj = parser.get_object()?;
                let parsed_num = match num_obj {
                    PDFObject::Number(n) => n as u32,
                    _ => {
                        return Err(PDFError::Generic(format!(
                            "Expected object number, got {:?}",
                            num_obj
                        )))
                    }
                };

                if parsed_num != obj_num {
                    return Err(PDFError::Generic(format!(
                        "Object number mismatch: expected {}, got {}",
                        obj_num, parsed_num
                    )));
                }

                // Read generation number
                let gen_obj = parser.get_object()?;
                let parsed_gen = match gen_obj {
                    PDFObject::Number(n) => n as u32,
                    _ => {
                        return Err(PDFError::Generic(format!(
                            "Expected generation number, got {:?}",
                            gen_obj
                        )))
                    }
                };

                if parsed_gen != generation {
                    return Err(PDFError::Generic(format!(
                        "Generation number mismatch: expected {}, got {}",
                        generation, parsed_gen
                    )));
                }

                // Read "obj" keyword
                let obj_keyword = parser.get_object()?;
                if !obj_keyword.is_command("obj") {
                    return Err(PDFError::Generic(format!(
                        "Expected 'obj' keyword, got {:?}",
                        obj_keyword
                    )));
                }

                // Read the actual object
                let object = parser.get_object()?;
                let object_rc = Rc::new(object);

                // Cache the Rc - cheap clone
                self.cache.put(obj_num, Rc::clone(&object_rc));

                Ok(object_rc)
            }

            XRefEntry::Compressed {
                obj_stream_num,
                index,
            } => {
                // Fetch from compressed object stream
                self.fetch_compressed(*obj_stream_num, *index)
            }
        }
    }

    /// Fetches an object if it's a reference, otherwise returns the object as-is.
    ///
    /// Returns an owned PDFObject (cloned from Rc if fetched from cache).
    /// Use `fetch()` directly if you want an Rc to avoid the clone.
    pub fn fetch_if_ref(&mut self, obj: &PDFObject) -> PDFResult<PDFObject> {
        match obj {
            PDFObject::Ref(Ref { num, generation }) => {
                let rc_obj = self.fetch(*num, *generation)?;
                Ok((*rc_obj).clone())
            }
            _ => Ok(obj.clone()),
        }
    }

    /// Returns the trailer dictionary.
    pub fn trailer(&self) -> Option<&PDFObject> {
        self.trailer.as_ref()
    }

    /// Returns the catalog (root) dictionary.
    pub fn catalog(&mut self) -> PDFResult<PDFObject> {
        // Clone the root reference to avoid borrow checker issues
        let root_ref = {
            let trailer = self
                .trailer
                .as_ref()
                .ok_or_else(|| PDFError::Generic("No trailer dictionary".to_string()))?;

            let trailer_dict = match trailer {
                PDFObject::Dictionary(dict) => dict,
                _ => {
                    return Err(PDFError::Generic(
                        "Trailer is not a dictionary".to_string(),
                    ))
                }
            };

            trailer_dict
                .get("Root")
                .ok_or_else(|| PDFError::Generic("No Root entry in trailer".to_string()))?
                .clone()
        };

        // Fetch and dereference the Rc
        let rc_catalog = match &root_ref {
            PDFObject::Ref(Ref { num, generation }) => self.fetch(*num, *generation)?,
            _ => return Ok(root_ref),
        };

        Ok((*rc_catalog).clone())
    }

    /// Returns the number of entries in the xref table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the xref table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Helper function to read big-endian integer from bytes.
///
/// Used for reading XRef stream entry fields.
fn read_big_endian(bytes: &[u8]) -> u64 {
    let mut result = 0u64;
    for &byte in bytes {
        result = (result << 8) | (byte as u64);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stream;

    #[test]
    fn test_xref_entry_is_free() {
        let free_entry = XRefEntry::Free {
            next_free: 0,
            generation: 65535,
        };
        assert!(free_entry.is_free());

        let uncompressed_entry = XRefEntry::Uncompressed {
            offset: 100,
            generation: 0,
        };
        assert!(!uncompressed_entry.is_free());
    }

    #[test]
    fn test_xref_entry_generation() {
        let entry = XRefEntry::Uncompressed {
            offset: 100,
            generation: 5,
        };
        assert_eq!(entry.generation(), 5);
    }

    #[test]
    fn test_parse_simple_xref() {
        let data = b"xref\n\
            0 1\n\
            0000000000 65535 f\n\
            trailer\n\
            << /Size 1 >>\n";

        let stream = Box::new(Stream::from_bytes(data.to_vec())) as Box<dyn BaseStream>;
        let mut xref = XRef::new(stream);

        xref.parse().unwrap();

        // Check that entry 0 is free
        let entry = xref.get_entry(0).unwrap();
        assert!(entry.is_free());
        assert_eq!(entry.generation(), 65535);

        // Check trailer
        assert!(xref.trailer().is_some());
    }

    #[test]
    fn test_parse_xref_with_multiple_entries() {
        let data = b"xref\n\
            0 3\n\
            0000000000 65535 f\n\
            0000000015 00000 n\n\
            0000000079 00000 n\n\
            trailer\n\
            << /Size 3 >>\n";

        let stream = Box::new(Stream::from_bytes(data.to_vec())) as Box<dyn BaseStream>;
        let mut xref = XRef::new(stream);

        xref.parse().unwrap();

        assert_eq!(xref.len(), 3);

        // Check entry 0 (free)
        let entry0 = xref.get_entry(0).unwrap();
        assert!(entry0.is_free());

        // Check entry 1 (uncompressed)
        let entry1 = xref.get_entry(1).unwrap();
        assert!(!entry1.is_free());
        if let XRefEntry::Uncompressed { offset, generation } = entry1 {
            assert_eq!(*offset, 15);
            assert_eq!(*generation, 0);
        } else {
            panic!("Expected uncompressed entry");
        }

        // Check entry 2 (uncompressed)
        let entry2 = xref.get_entry(2).unwrap();
        if let XRefEntry::Uncompressed { offset, generation } = entry2 {
            assert_eq!(*offset, 79);
            assert_eq!(*generation, 0);
        } else {
            panic!("Expected uncompressed entry");
        }
    }

    #[test]
    fn test_fetch_indirect_object() {
        // Create a minimal PDF with an indirect object
        let data = b"1 0 obj\n\
            42\n\
            endobj\n\
            xref\n\
            0 2\n\
            0000000000 65535 f\n\
            0000000000 00000 n\n\
            trailer\n\
            << /Size 2 >>\n";

        let stream = Box::new(Stream::from_bytes(data.to_vec())) as Box<dyn BaseStream>;
        let mut xref = XRef::new(stream);

        // Parse xref starting from "xref" position
        // First, we need to position the stream at the xref
        let xref_pos = data
            .windows(4)
            .position(|w| w == b"xref")
            .expect("xref not found");
        xref.stream.set_pos(xref_pos).unwrap();
        xref.parse().unwrap();

        // Fetch object 1
        let obj = xref.fetch(1, 0).unwrap();
        assert_eq!(*obj, PDFObject::Number(42.0));
    }

    #[test]
    fn test_fetch_if_ref() {
        let data = b"1 0 obj\n\
            42\n\
            endobj\n\
            xref\n\
            0 2\n\
            0000000000 65535 f\n\
            0000000000 00000 n\n\
            trailer\n\
            << /Size 2 >>\n";

        let stream = Box::new(Stream::from_bytes(data.to_vec())) as Box<dyn BaseStream>;
        let mut xref = XRef::new(stream);

        let xref_pos = data
            .windows(4)
            .position(|w| w == b"xref")
            .expect("xref not found");
        xref.stream.set_pos(xref_pos).unwrap();
        xref.parse().unwrap();

        // Test with a reference
        let ref_obj = PDFObject::Ref(Ref {
            num: 1,
            generation: 0,
        });
        let result = xref.fetch_if_ref(&ref_obj).unwrap();
        assert_eq!(result, PDFObject::Number(42.0));

        // Test with a direct object
        let direct_obj = PDFObject::Number(100.0);
        let result = xref.fetch_if_ref(&direct_obj).unwrap();
        assert_eq!(result, PDFObject::Number(100.0));
    }

    #[test]
    #[ignore] // TODO: Fix test - stream data needs to be properly positioned in complete PDF
    fn test_parse_xref_stream() {
        // Create a minimal XRef stream
        // This tests parsing of PDF 1.5+ XRef streams (compressed cross-reference tables)
        //
        // XRef stream format:
        // N 0 obj
        // << /Type /XRef /Size 3 /W [1 2 1] >>
        // stream
        // <binary data>
        // endstream
        // endobj
        //
        // /W [1 2 1] means:
        // - 1 byte for type (0=free, 1=uncompressed, 2=compressed)
        // - 2 bytes for offset/obj_stream_num
        // - 1 byte for generation/index
        //
        // We'll create entries for objects 0-2:
        // Entry 0: Free (type=0, next_free=0, generation=255)
        // Entry 1: Uncompressed (type=1, offset=15, generation=0)
        // Entry 2: Uncompressed (type=1, offset=79, generation=0)

        // Build the PDF data manually
        let mut data = Vec::new();

            // Binary XRef stream data (12 bytes total: 3 entries * 4 bytes each)
        let xref_data = vec![
            // Entry 0: type=0, next_free=0 (0x0000), generation=255 (0xFF)
            0x00, 0x00, 0x00, 0xFF,
            // Entry 1: type=1, offset=15 (0x000F), generation=0
            0x01, 0x00, 0x0F, 0x00,
            // Entry 2: type=1, offset=79 (0x004F), generation=0
            0x01, 0x00, 0x4F, 0x00,
        ];

        // Object header
        data.extend_from_slice(b"1 0 obj\n");
        data.extend_from_slice(b"<< /Type /XRef /Size 3 /W [1 2 1] /Length 12 >>\n");
        data.extend_from_slice(b"stream\n");
        data.extend_from_slice(&xref_data);
        data.extend_from_slice(b"endstream\nendobj\n");

        let stream = Box::new(Stream::from_bytes(data)) as Box<dyn BaseStream>;
        let mut xref = XRef::new(stream);

        xref.parse().unwrap();

        // Verify we have 3 entries
        assert_eq!(xref.len(), 3);

        // Check entry 0 (free)
        let entry0 = xref.get_entry(0).unwrap();
        assert!(entry0.is_free());
        assert_eq!(entry0.generation(), 255); // 0xFF = 255

        // Check entry 1 (uncompressed at offset 15)
        let entry1 = xref.get_entry(1).unwrap();
        assert!(!entry1.is_free());
        if let XRefEntry::Uncompressed { offset, generation } = entry1 {
            assert_eq!(*offset, 15);
            assert_eq!(*generation, 0);
        } else {
            panic!("Expected uncompressed entry, got {:?}", entry1);
        }

        // Check entry 2 (uncompressed at offset 79)
        let entry2 = xref.get_entry(2).unwrap();
        if let XRefEntry::Uncompressed { offset, generation } = entry2 {
            assert_eq!(*offset, 79);
            assert_eq!(*generation, 0);
        } else {
            panic!("Expected uncompressed entry, got {:?}", entry2);
        }

        // Verify trailer dictionary contains XRef stream properties
        let trailer = xref.trailer().unwrap();
        if let PDFObject::Dictionary(dict) = trailer {
            // Check /Type is /XRef
            if let Some(PDFObject::Name(type_name)) = dict.get("Type") {
                assert_eq!(type_name, "XRef");
            } else {
                panic!("Expected /Type /XRef in trailer");
            }

            // Check /Size is 3
            if let Some(PDFObject::Number(size)) = dict.get("Size") {
                assert_eq!(*size, 3.0);
            } else {
                panic!("Expected /Size 3 in trailer");
            }
        } else {
            panic!("Expected dictionary trailer");
        }
    }

    #[test]
    #[ignore] // TODO: Fix test - stream data needs to be properly positioned in complete PDF
    fn test_parse_xref_stream_with_compressed_entries() {
        // Test XRef stream with type 2 (compressed) entries
        // This represents objects stored in ObjStm (object streams)
        //
        // Entry 0: Free (type=0)
        // Entry 1: Compressed in stream 5, index 0 (type=2, obj_stream=5, index=0)
        // Entry 2: Compressed in stream 5, index 1 (type=2, obj_stream=5, index=1)

        let mut data = Vec::new();

          // Binary XRef stream data (12 bytes total: 3 entries * 4 bytes each)
        let xref_data = vec![
            // Entry 0: free
            0x00, 0x00, 0x00, 0xFF,
            // Entry 1: compressed in stream 5, index 0
            0x02, 0x00, 0x05, 0x00,
            // Entry 2: compressed in stream 5, index 1
            0x02, 0x00, 0x05, 0x01,
        ];

        // Object header
        data.extend_from_slice(b"1 0 obj\n");
        data.extend_from_slice(b"<< /Type /XRef /Size 3 /W [1 2 1] /Length 12 >>\n");
        data.extend_from_slice(b"stream\n");
        data.extend_from_slice(&xref_data);
        data.extend_from_slice(b"endstream\nendobj\n");

        let stream = Box::new(Stream::from_bytes(data)) as Box<dyn BaseStream>;
        let mut xref = XRef::new(stream);

        xref.parse().unwrap();

        assert_eq!(xref.len(), 3);

        // Check entry 0 (free)
        let entry0 = xref.get_entry(0).unwrap();
        assert!(entry0.is_free());

        // Check entry 1 (compressed)
        let entry1 = xref.get_entry(1).unwrap();
        if let XRefEntry::Compressed { obj_stream_num, index } = entry1 {
            assert_eq!(*obj_stream_num, 5);
            assert_eq!(*index, 0);
        } else {
            panic!("Expected compressed entry, got {:?}", entry1);
        }

        // Check entry 2 (compressed)
        let entry2 = xref.get_entry(2).unwrap();
        if let XRefEntry::Compressed { obj_stream_num, index } = entry2 {
            assert_eq!(*obj_stream_num, 5);
            assert_eq!(*index, 1);
        } else {
            panic!("Expected compressed entry, got {:?}", entry2);
        }
    }
}
