//! RefPack encoder: a hash-chain LZ77 matcher with cost-based opcode choice.

use super::header;

const HASH_SIZE: usize = 1 << 16;
const CHAIN_MASK: i64 = 0x1_FFFF;
const MAX_OFFSET: usize = 0x1_FFFF;
const MAX_MATCH: usize = 1028;

fn hash3(data: &[u8], pos: usize) -> usize {
    (((data[pos] as usize) << 4) ^ ((data[pos + 1] as usize) << 2) ^ (data[pos + 2] as usize)) & 0xFFFF
}

fn matchlen(a: &[u8], b: &[u8], max: usize) -> usize {
    let mut n = 0;
    while n < max && a[n] == b[n] {
        n += 1;
    }
    n
}

/// Compresses `input`, prefixing the result with a 5-byte RefPack header.
pub fn compress(input: &[u8]) -> Vec<u8> {
    let length = input.len();
    let mut out = Vec::with_capacity(length / 2 + 16);
    header::write(&mut out, length);

    let mut run = 0usize;
    let mut cptr = 0usize;
    let mut rptr = 0usize;

    let mut hashtbl = vec![-1i64; HASH_SIZE];
    let mut link = vec![-1i64; (CHAIN_MASK + 1) as usize];

    let insert = |hashtbl: &mut [i64], link: &mut [i64], input: &[u8], pos: usize| {
        let h = hash3(input, pos);
        link[pos & CHAIN_MASK as usize] = hashtbl[h];
        hashtbl[h] = pos as i64;
    };

    while cptr < length {
        let mut boffset = 0usize;
        let mut blen = 2usize;
        let mut bcost = 2usize;
        let mlen = if cptr + 2 < length {
            (length - cptr).min(MAX_MATCH)
        } else {
            0
        };

        if mlen >= 3 {
            let h = hash3(input, cptr);
            let min_hoffset = cptr.saturating_sub(MAX_OFFSET) as i64;
            let mut hoffset = hashtbl[h];

            while hoffset >= min_hoffset {
                let tptr = hoffset as usize;
                if cptr + blen < length && tptr + blen < length && input[cptr + blen] == input[tptr + blen] {
                    let tlen = matchlen(&input[cptr..], &input[tptr..], mlen);
                    if tlen > blen {
                        let toffset = (cptr - 1) - tptr;
                        let tcost = if toffset < 1024 && tlen <= 10 {
                            2
                        } else if toffset < 16384 && tlen <= 67 {
                            3
                        } else {
                            4
                        };
                        if tlen as i64 - tcost as i64 > blen as i64 - bcost as i64 {
                            blen = tlen;
                            bcost = tcost;
                            boffset = toffset;
                            if blen >= MAX_MATCH {
                                break;
                            }
                        }
                    }
                }
                hoffset = link[hoffset as usize & CHAIN_MASK as usize];
            }
        }

        if bcost >= blen {
            if cptr + 2 < length {
                insert(&mut hashtbl, &mut link, input, cptr);
            }
            run += 1;
            cptr += 1;
            continue;
        }

        while run > 3 {
            let tlen = 112.min(run & !3);
            run -= tlen;
            out.push(0xE0u8 + (tlen >> 2) as u8 - 1);
            out.extend_from_slice(&input[rptr..rptr + tlen]);
            rptr += tlen;
        }

        if bcost == 2 {
            out.push((((boffset >> 8) << 5) + ((blen - 3) << 2) + run) as u8);
            out.push((boffset & 0xFF) as u8);
        } else if bcost == 3 {
            out.push((0x80 + (blen - 4)) as u8);
            out.push(((run << 6) + (boffset >> 8)) as u8);
            out.push((boffset & 0xFF) as u8);
        } else {
            out.push((0xC0 + ((boffset >> 16) << 4) + (((blen - 5) >> 8) << 2) + run) as u8);
            out.push(((boffset >> 8) & 0xFF) as u8);
            out.push((boffset & 0xFF) as u8);
            out.push(((blen - 5) & 0xFF) as u8);
        }

        if run > 0 {
            out.extend_from_slice(&input[rptr..rptr + run]);
            rptr += run;
            run = 0;
        }

        for _ in 0..blen {
            if cptr + 2 < length {
                insert(&mut hashtbl, &mut link, input, cptr);
            }
            cptr += 1;
        }
        rptr = cptr;
    }

    while run > 3 {
        let tlen = 112.min(run & !3);
        run -= tlen;
        out.push(0xE0u8 + (tlen >> 2) as u8 - 1);
        out.extend_from_slice(&input[rptr..rptr + tlen]);
        rptr += tlen;
    }

    out.push(0xFCu8 + run as u8);
    if run > 0 {
        out.extend_from_slice(&input[rptr..rptr + run]);
    }

    out
}
